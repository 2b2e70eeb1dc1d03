//! Modelos del calendario normalizado
//!
//! Forma estable que expone el servicio sin importar las irregularidades
//! del proveedor. Los campos opcionales se serializan como `null`.

use serde::{Serialize, Serializer};

/// Serie fija publicada por el servicio
pub const SERIES: &str = "f1";

/// Calendario normalizado de una temporada
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizedSchedule {
    pub series: String,
    pub limit: String,
    pub offset: String,
    pub total: i64,
    pub season: String,
    pub races: Vec<Race>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Race {
    pub season: String,
    pub round: String,
    pub url: String,
    #[serde(rename = "raceName")]
    pub race_name: String,
    #[serde(rename = "Circuit")]
    pub circuit: Circuit,
    pub date: Option<String>,
    pub time: Option<String>,
    #[serde(rename = "FirstPractice")]
    pub first_practice: Option<SessionTime>,
    #[serde(rename = "SecondPractice")]
    pub second_practice: Option<SessionTime>,
    #[serde(rename = "ThirdPractice")]
    pub third_practice: Option<SessionTime>,
    #[serde(rename = "Qualifying")]
    pub qualifying: Option<SessionTime>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Circuit {
    #[serde(rename = "circuitId")]
    pub circuit_id: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "circuitName")]
    pub circuit_name: Option<String>,
    #[serde(rename = "Location")]
    pub location: Location,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Location {
    pub lat: Option<String>,
    pub long: Option<String>,
    pub locality: Option<String>,
    pub country: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionTime {
    pub date: String,
    pub time: String,
}

#[derive(Serialize)]
struct ScheduleEnvelope<'a> {
    #[serde(rename = "ApiColapinto")]
    api_colapinto: ScheduleBody<'a>,
}

#[derive(Serialize)]
struct ScheduleBody<'a> {
    series: &'a str,
    limit: &'a str,
    offset: &'a str,
    total: String,
    #[serde(rename = "RaceTable")]
    race_table: RaceTable<'a>,
}

#[derive(Serialize)]
struct RaceTable<'a> {
    season: &'a str,
    #[serde(rename = "Races")]
    races: &'a [Race],
}

impl Serialize for NormalizedSchedule {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        ScheduleEnvelope {
            api_colapinto: ScheduleBody {
                series: &self.series,
                limit: &self.limit,
                offset: &self.offset,
                total: self.total.to_string(),
                race_table: RaceTable {
                    season: &self.season,
                    races: &self.races,
                },
            },
        }
        .serialize(serializer)
    }
}
