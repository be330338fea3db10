//! Tests for the Silver layer
//!
//! Fixtures mirror the raw INMET vocabulary: Portuguese headers, `,` decimal
//! separators, "0400 UTC" hour tokens and the `---` placeholder.

pub mod quality_tests;

use polars::prelude::*;

pub const RAW_DATE: &str = "Data";
pub const RAW_HOUR: &str = "Hora UTC";
pub const RAW_PRECIPITATION: &str = "PRECIPITAÇÃO TOTAL, HORÁRIO (mm)";
pub const RAW_HUMIDITY: &str = "UMIDADE RELATIVA DO AR, HORARIA (%)";
pub const RAW_TEMPERATURE: &str = "TEMPERATURA DO AR - BULBO SECO, HORARIA (°C)";

/// Four raw rows: one duplicate pair, one bad precipitation token, and
/// out-of-range humidity, temperature and precipitation readings
pub fn sample_bronze_frame() -> DataFrame {
    df!(
        RAW_DATE => ["2023/01/01", "2023/01/01", "2023/01/01", "2023/01/02"],
        RAW_HOUR => ["0400 UTC", "0500 UTC", "0500 UTC", "0000 UTC"],
        RAW_PRECIPITATION => ["0,1", "---", "0,3", "-5"],
        RAW_HUMIDITY => ["80", "105", "85", "90"],
        RAW_TEMPERATURE => ["25,5", "26,0", "26,1", "99"],
        "municipio" => ["JOAO PESSOA", "JOAO PESSOA", "JOAO PESSOA", "CAMPINA GRANDE"],
        "source_file" => ["file1.csv", "file1.csv", "file1.csv", "file2.csv"],
        "partition_year" => [2023i32, 2023, 2023, 2023],
    )
    .unwrap()
}

/// Minimal raw frame with only date, hour and temperature
pub fn hourly_frame(dates: &[&str], hours: &[&str], temperatures: &[&str]) -> DataFrame {
    let files = vec!["INMET_NE_PB_A320_JOAO PESSOA.CSV"; dates.len()];
    df!(
        RAW_DATE => dates,
        RAW_HOUR => hours,
        RAW_TEMPERATURE => temperatures,
        "source_file" => files,
    )
    .unwrap()
}
