use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};
use tabled::{settings::Style, Table, Tabled};

use crate::error::Result;

// Outputs land via a sibling `.tmp` file and a rename.
fn temp_path(path: &Path) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".tmp");
    path.with_file_name(name)
}

fn ensure_parent(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub fn write_csv<T: Serialize>(path: &Path, rows: &[T]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        for r in rows {
            wtr.serialize(r)?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

/// Write a header plus pre-rendered records; used where the column set is
/// only known at runtime.
pub fn write_csv_records(path: &Path, header: &[String], records: &[Vec<String>]) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        wtr.write_record(header)?;
        for r in records {
            wtr.write_record(r)?;
        }
        wtr.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    ensure_parent(path)?;
    let tmp = temp_path(path);
    let s = serde_json::to_string_pretty(value)?;
    fs::write(&tmp, s)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

pub fn preview_table<T>(title: &str, note: Option<&str>, rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    println!("\n{}", title);
    if let Some(n) = note {
        println!("({})", n);
    }
    println!();
    preview_table_rows(rows, max_rows);
}

pub fn preview_table_rows<T>(rows: &[T], max_rows: usize)
where
    T: Tabled + Clone,
{
    let slice: Vec<T> = rows.iter().cloned().take(max_rows).collect();
    if slice.is_empty() {
        println!("(no rows)\n");
        return;
    }
    let table_str = Table::new(slice).with(Style::markdown()).to_string();
    println!("{}\n", table_str);
}
