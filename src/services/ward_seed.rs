//! Ward lookup CSV loading
//!
//! The CSV header names its columns loosely, so the ward, zone and name
//! columns are located by substring. Rows without a ward or zone are
//! skipped.

use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::config::Args;
use crate::db::schemas::{UpsertSummary, WardDoc};
use crate::db::CivicStore;
use crate::types::{CivicError, Result};

/// Parse ward rows for `city` from CSV text
pub fn parse_ward_csv(raw: &str, city: &str) -> Result<Vec<WardDoc>> {
    let lines: Vec<&str> = raw
        .lines()
        .map(|l| l.trim_end_matches('\r'))
        .filter(|l| !l.is_empty())
        .collect();
    if lines.len() <= 1 {
        return Err(CivicError::bad_request("CSV has no data"));
    }

    let header: Vec<String> = lines[0]
        .split(',')
        .map(|h| h.trim().to_lowercase())
        .collect();
    let column = |needle: &str| header.iter().position(|h| h.contains(needle));
    let (ward_idx, zone_idx, name_idx) = (column("ward"), column("zone"), column("name"));

    let mut wards = Vec::new();
    for line in &lines[1..] {
        let cols: Vec<&str> = line.split(',').collect();
        if cols.len() < 2 {
            continue;
        }
        let cell = |idx: Option<usize>| {
            idx.and_then(|i| cols.get(i))
                .map(|c| c.trim())
                .unwrap_or_default()
        };
        let (ward, zone) = (cell(ward_idx), cell(zone_idx));
        if ward.is_empty() || zone.is_empty() {
            continue;
        }
        let name = Some(cell(name_idx))
            .filter(|n| !n.is_empty())
            .map(str::to_string);
        wards.push(WardDoc::new(city, ward, zone, name));
    }

    if wards.is_empty() {
        return Err(CivicError::bad_request("No valid ward rows found"));
    }
    Ok(wards)
}

/// First existing candidate path
pub fn find_seed_file(candidates: &[PathBuf]) -> Option<&Path> {
    candidates.iter().map(PathBuf::as_path).find(|p| p.is_file())
}

/// Load the configured CSV and upsert its wards
pub async fn seed_wards_from_file(store: &dyn CivicStore, args: &Args) -> Result<UpsertSummary> {
    let candidates = args.ward_seed_candidates();
    let path = find_seed_file(&candidates)
        .ok_or_else(|| CivicError::not_found("Seed CSV not found"))?;

    let raw = tokio::fs::read_to_string(path).await?;
    let wards = parse_ward_csv(&raw, &args.city)?;
    let parsed = wards.len();
    let summary = store.upsert_wards(wards).await?;

    info!(
        path = %path.display(),
        rows = parsed,
        upserted = summary.upserted,
        modified = summary.modified,
        "Seeded wards for {}",
        args.city
    );
    Ok(summary)
}

/// Seed wards at startup when the city has none; failures are only logged
pub async fn auto_seed_wards(store: &dyn CivicStore, args: &Args) {
    match store.count_wards(&args.city).await {
        Ok(0) => {}
        Ok(count) => {
            info!("{} wards already loaded for {}", count, args.city);
            return;
        }
        Err(e) => {
            warn!("Ward auto-seed skipped: {}", e);
            return;
        }
    }

    if find_seed_file(&args.ward_seed_candidates()).is_none() {
        warn!(
            "No wards for {} and no seed CSV at {}",
            args.city,
            args.ward_seed_file.display()
        );
        return;
    }

    if let Err(e) = seed_wards_from_file(store, args).await {
        warn!("Ward auto-seed failed: {}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_header_detection() {
        let raw = "Zone No, Ward No ,Area Name\r\n1,10,Teppakulam\r\n2,25,\n";
        let wards = parse_ward_csv(raw, "Madurai").unwrap();

        assert_eq!(wards.len(), 2);
        assert_eq!(wards[0].ward_number, "10");
        assert_eq!(wards[0].zone_number, "1");
        assert_eq!(wards[0].name.as_deref(), Some("Teppakulam"));
        assert_eq!(wards[1].name, None);
        assert_eq!(wards[1].city, "Madurai");
    }

    #[test]
    fn test_rows_missing_keys_skipped() {
        let raw = "ward,zone\n,3\n7,\nonly-one-column\n8,4\n";
        let wards = parse_ward_csv(raw, "Madurai").unwrap();
        assert_eq!(wards.len(), 1);
        assert_eq!(wards[0].ward_number, "8");
    }

    #[test]
    fn test_empty_and_unusable_csv() {
        let err = parse_ward_csv("ward,zone\n\n", "Madurai").unwrap_err();
        assert_eq!(err.to_string(), "CSV has no data");

        let err = parse_ward_csv("area,district\nx,y\n", "Madurai").unwrap_err();
        assert_eq!(err.to_string(), "No valid ward rows found");
    }

    #[test]
    fn test_find_seed_file() {
        let missing = vec![PathBuf::from("/definitely/not/here.csv")];
        assert!(find_seed_file(&missing).is_none());

        let existing = vec![missing[0].clone(), PathBuf::from("Cargo.toml")];
        assert_eq!(find_seed_file(&existing), Some(Path::new("Cargo.toml")));
    }
}
