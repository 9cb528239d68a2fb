use std::fs::File;
use std::io::{self, BufWriter};
use std::path::PathBuf;

use anyhow::{Context, Result};
use log::info;

use squadlink::config::flag_value;
use squadlink::{features, schema};

fn main() -> Result<()> {
    let _ = dotenvy::from_filename(".env.local");
    let _ = dotenvy::from_filename(".env");
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp(None)
        .init();

    let args = std::env::args().skip(1).collect::<Vec<_>>();
    let db_path = flag_value(&args, "--db")
        .or_else(|| std::env::var("APP_DB_PATH").ok())
        .filter(|raw| !raw.trim().is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(schema::default_db_path);
    if !db_path.is_file() {
        anyhow::bail!("store {} does not exist; run the ingest first", db_path.display());
    }

    let conn = schema::open_db(&db_path)?;
    let rows = features::all_match_features(&conn)?;
    info!("built features for {} matches from {}", rows.len(), db_path.display());

    let written = match flag_value(&args, "--out").map(PathBuf::from) {
        Some(out) => {
            let file = File::create(&out).with_context(|| format!("create {}", out.display()))?;
            let n = features::write_csv(&rows, BufWriter::new(file))?;
            println!("Wrote {n} rows to {}", out.display());
            n
        }
        None => features::write_csv(&rows, io::stdout().lock())?,
    };
    info!("exported {written} feature rows");

    Ok(())
}
