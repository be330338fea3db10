//! Tests for the Bronze layer
//!
//! Archives are built in memory with `zip::ZipWriter`; station files are
//! Latin-1 encoded like the published ones.


use encoding_rs::WINDOWS_1252;
use std::io::{Cursor, Write};
use zip::write::FileOptions;

pub const STATION_FILE: &str = "INMET_NE_PB_A320_JOAO PESSOA_01-01-2023_A_31-12-2023.CSV";
pub const OTHER_STATION_FILE: &str = "INMET_NE_PB_A321_PATOS_01-01-2023_A_31-12-2023.CSV";

/// Station file text: preamble, header with trailing delimiter, three rows
pub fn station_csv(station: &str, wmo: &str) -> String {
    format!(
        "REGIAO:;NE\nUF:;PB\nESTACAO:;{station}\nCODIGO (WMO):;{wmo}\nLATITUDE:;-7,16\n\
LONGITUDE:;-34,81\nALTITUDE:;33,5\nDATA DE FUNDACAO:;25/07/07\n\
Data;Hora UTC;PRECIPITAÇÃO TOTAL, HORÁRIO (mm);TEMPERATURA DO AR - BULBO SECO, HORARIA (°C);UMIDADE RELATIVA DO AR, HORARIA (%);\n\
2023/01/01;0000 UTC;0;26,1;80;\n\
2023/01/01;0100 UTC;0,2;25,8;82;\n\
2023/01/01;0200 UTC;;25,5;;\n"
    )
}

pub fn latin1(text: &str) -> Vec<u8> {
    let (bytes, _, _) = WINDOWS_1252.encode(text);
    bytes.into_owned()
}

pub fn build_zip(files: &[(&str, Vec<u8>)]) -> Vec<u8> {
    let mut writer = zip::ZipWriter::new(Cursor::new(Vec::new()));
    for (name, content) in files {
        writer.start_file(*name, FileOptions::default()).unwrap();
        writer.write_all(content).unwrap();
    }
    writer.finish().unwrap().into_inner()
}

/// Yearly archive with the João Pessoa file, a Patos file and a readme
pub fn sample_archive() -> Vec<u8> {
    build_zip(&[
        (STATION_FILE, latin1(&station_csv("JOAO PESSOA", "A320"))),
        (OTHER_STATION_FILE, latin1(&station_csv("PATOS", "A321"))),
        ("LEIAME.txt", b"nothing to see".to_vec()),
    ])
}
