//! Application constants for the INMET pipeline
//!
//! Raw header vocabulary, canonical column names, plausibility limits and
//! the Gold schema vocabulary. The configuration defaults in `config` are
//! built from these tables.

// =============================================================================
// Lake Layout
// =============================================================================

/// Default data lake root, relative to the working directory
pub const DEFAULT_LAKE_ROOT: &str = "data";

pub const BRONZE_DATASET: &str = "bronze/inmet_climate_data";
pub const SILVER_DATASET: &str = "silver/inmet_climate_data";
pub const GOLD_DATASET: &str = "gold/dm_inmet_daily_metrics";

/// Single target timezone for local wall-clock values
pub const TARGET_TIMEZONE: &str = "America/Fortaleza";

// =============================================================================
// Bronze Acquisition
// =============================================================================

pub mod acquisition {
    /// `{year}` is substituted with the four-digit year
    pub const URL_TEMPLATE: &str = "https://portal.inmet.gov.br/uploads/dadoshistoricos/{year}.zip";

    /// Station code fragment selecting files inside the yearly archive (João Pessoa)
    pub const STATION_FILE_FILTER: &str = "_A320_";

    pub const YEARS_BACK: u32 = 5;
    pub const MAX_WORKERS: usize = 5;
    pub const REQUEST_TIMEOUT_SECS: u64 = 300;

    /// Metadata lines preceding the column header in every station CSV
    pub const METADATA_ROWS: usize = 8;
    pub const DELIMITER: u8 = b';';

    /// Metadata keys as written in the station CSV preamble
    pub const META_REGION: &str = "REGIAO";
    pub const META_STATE: &str = "UF";
    pub const META_STATION: &str = "ESTACAO";
    pub const META_WMO_CODE: &str = "CODIGO (WMO)";
    pub const META_LATITUDE: &str = "LATITUDE";
    pub const META_LONGITUDE: &str = "LONGITUDE";
    pub const META_ALTITUDE: &str = "ALTITUDE";
    pub const META_FOUNDED: &str = "DATA DE FUNDACAO";
}

// =============================================================================
// Column Vocabulary
// =============================================================================

/// Canonical hourly column names
pub mod columns {
    pub const DATE: &str = "data";
    pub const HOUR_UTC: &str = "hora_utc";
    pub const PRECIPITATION: &str = "precipitacao_total_horario_mm";
    pub const PRESSURE_STATION: &str = "pressao_atm_estacao_horaria_mb";
    pub const PRESSURE_MAX: &str = "pressao_atm_max_hora_ant_mb";
    pub const PRESSURE_MIN: &str = "pressao_atm_min_hora_ant_mb";
    pub const RADIATION: &str = "radiacao_global_kj_m2";
    pub const TEMP_DRY_BULB: &str = "temperatura_ar_bulbo_seco_horaria_c";
    pub const TEMP_DEW_POINT: &str = "temperatura_ponto_orvalho_c";
    pub const TEMP_MAX: &str = "temperatura_max_hora_ant_c";
    pub const TEMP_MIN: &str = "temperatura_min_hora_ant_c";
    pub const DEW_POINT_MAX: &str = "temperatura_orvalho_max_hora_ant_c";
    pub const DEW_POINT_MIN: &str = "temperatura_orvalho_min_hora_ant_c";
    pub const HUMIDITY_MAX: &str = "umidade_rel_max_hora_ant_percent";
    pub const HUMIDITY_MIN: &str = "umidade_rel_min_hora_ant_percent";
    pub const HUMIDITY: &str = "umidade_relativa_ar_horaria_percent";
    pub const WIND_DIRECTION: &str = "vento_direcao_horaria_gr";
    pub const WIND_GUST: &str = "vento_rajada_maxima_ms";
    pub const WIND_SPEED: &str = "vento_velocidade_horaria_ms";

    pub const STATION: &str = "municipio";
    pub const STATE: &str = "uf";
    pub const WMO_CODE: &str = "codigo_wmo";
    pub const SOURCE_FILE: &str = "source_file";

    pub const OBSERVATION_TIMESTAMP: &str = "observation_timestamp";
    pub const PARTITION_YEAR: &str = "partition_year";
    pub const PARTITION_MONTH: &str = "partition_month";

    /// Local calendar date of an observation, the Gold grouping date
    pub const CALENDAR_DATE: &str = "data_local";
    pub const GOLD_YEAR: &str = "ano";
    pub const GOLD_MONTH: &str = "mes";
}

/// Raw INMET header → canonical name, in output column order
pub const RAW_COLUMN_MAP: &[(&str, &str)] = &[
    ("Data", columns::DATE),
    ("Hora UTC", columns::HOUR_UTC),
    ("PRECIPITAÇÃO TOTAL, HORÁRIO (mm)", columns::PRECIPITATION),
    (
        "PRESSAO ATMOSFERICA AO NIVEL DA ESTACAO, HORARIA (mB)",
        columns::PRESSURE_STATION,
    ),
    (
        "PRESSÃO ATMOSFERICA MAX.NA HORA ANT. (AUT) (mB)",
        columns::PRESSURE_MAX,
    ),
    (
        "PRESSÃO ATMOSFERICA MIN. NA HORA ANT. (AUT) (mB)",
        columns::PRESSURE_MIN,
    ),
    ("RADIACAO GLOBAL (Kj/m²)", columns::RADIATION),
    (
        "TEMPERATURA DO AR - BULBO SECO, HORARIA (°C)",
        columns::TEMP_DRY_BULB,
    ),
    ("TEMPERATURA DO PONTO DE ORVALHO (°C)", columns::TEMP_DEW_POINT),
    ("TEMPERATURA MÁXIMA NA HORA ANT. (AUT) (°C)", columns::TEMP_MAX),
    ("TEMPERATURA MÍNIMA NA HORA ANT. (AUT) (°C)", columns::TEMP_MIN),
    (
        "TEMPERATURA ORVALHO MAX. NA HORA ANT. (AUT) (°C)",
        columns::DEW_POINT_MAX,
    ),
    (
        "TEMPERATURA ORVALHO MIN. NA HORA ANT. (AUT) (°C)",
        columns::DEW_POINT_MIN,
    ),
    ("UMIDADE REL. MAX. NA HORA ANT. (AUT) (%)", columns::HUMIDITY_MAX),
    ("UMIDADE REL. MIN. NA HORA ANT. (AUT) (%)", columns::HUMIDITY_MIN),
    ("UMIDADE RELATIVA DO AR, HORARIA (%)", columns::HUMIDITY),
    ("VENTO, DIREÇÃO HORARIA (gr) (° (gr))", columns::WIND_DIRECTION),
    ("VENTO, RAJADA MAXIMA (m/s)", columns::WIND_GUST),
    ("VENTO, VELOCIDADE HORARIA (m/s)", columns::WIND_SPEED),
    (columns::STATION, columns::STATION),
    (columns::STATE, columns::STATE),
    (columns::WMO_CODE, columns::WMO_CODE),
    (columns::SOURCE_FILE, columns::SOURCE_FILE),
    (columns::PARTITION_YEAR, columns::PARTITION_YEAR),
];

/// Canonical columns coerced to f64 by the normalizer
pub const MEASUREMENT_COLUMNS: &[&str] = &[
    columns::PRECIPITATION,
    columns::PRESSURE_STATION,
    columns::PRESSURE_MAX,
    columns::PRESSURE_MIN,
    columns::RADIATION,
    columns::TEMP_DRY_BULB,
    columns::TEMP_DEW_POINT,
    columns::TEMP_MAX,
    columns::TEMP_MIN,
    columns::DEW_POINT_MAX,
    columns::DEW_POINT_MIN,
    columns::HUMIDITY_MAX,
    columns::HUMIDITY_MIN,
    columns::HUMIDITY,
    columns::WIND_DIRECTION,
    columns::WIND_GUST,
    columns::WIND_SPEED,
];

// =============================================================================
// Normalization
// =============================================================================

pub mod timestamp {
    pub const FORMAT: &str = "%Y/%m/%d %H%M";
    pub const HOUR_UNIT_SUFFIX: &str = "UTC";
    pub const HOUR_WIDTH: usize = 4;
    pub const END_OF_DAY: &str = "2400";
    pub const START_OF_DAY: &str = "0000";
}

/// INMET writes `,` as the decimal separator
pub const DECIMAL_SEPARATOR: char = ',';

/// Sentinel written by older station loggers for a missing reading
pub const MISSING_VALUE_TOKENS: &[&str] = &["-9999"];

// =============================================================================
// Plausibility Limits
// =============================================================================

pub mod limits {
    pub const HUMIDITY_MIN: f64 = 0.0;
    pub const HUMIDITY_MAX: f64 = 100.0;
    pub const PRECIPITATION_MIN: f64 = 0.0;
    pub const TEMPERATURE_MIN: f64 = -20.0;
    pub const TEMPERATURE_MAX: f64 = 50.0;

    /// Column-name fragments selecting a measurement family
    pub const HUMIDITY_FAMILY: &str = "umidade";
    pub const TEMPERATURE_FAMILY: &str = "temperatura";
}

// =============================================================================
// Gold Metrics
// =============================================================================

pub mod metrics {
    pub const TEMP_MAX_DAILY: &str = "temp_maxima_diaria_c";
    pub const TEMP_MIN_DAILY: &str = "temp_minima_diaria_c";
    pub const PRECIPITATION_DAILY: &str = "precipitacao_total_diaria_mm";
    pub const TEMP_MEAN_DAILY: &str = "temp_media_diaria_c";
    pub const HUMIDITY_MEAN_DAILY: &str = "umidade_media_diaria_percentual";
    pub const RADIATION_DAILY: &str = "radiacao_total_diaria_kj_m2";
    pub const WIND_SPEED_MEAN_DAILY: &str = "vento_velocidade_media_diaria_ms";
    pub const WIND_GUST_MAX_DAILY: &str = "vento_rajada_maxima_diaria_ms";
    pub const THERMAL_AMPLITUDE_DAILY: &str = "amplitude_termica_diaria_c";

    pub const DEFAULT_PRECISION: u32 = 10;
    pub const DEFAULT_SCALE: u32 = 2;
    pub const PRECIPITATION_SCALE: u32 = 1;
    pub const RADIATION_PRECISION: u32 = 12;
}

// =============================================================================
// Storage
// =============================================================================

/// Directory name used for null partition values
pub const NULL_PARTITION_VALUE: &str = "__HIVE_DEFAULT_PARTITION__";

pub const PARQUET_EXTENSION: &str = "parquet";

/// Prefix of in-flight staging directories; skipped by readers
pub const STAGING_PREFIX: &str = ".staging-";
