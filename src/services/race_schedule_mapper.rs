//! Mapeo del documento del proveedor al calendario normalizado
//!
//! El proveedor es externo y su completitud varía: cada carrera se valida
//! por separado y las inválidas se descartan sin fallar la respuesta. Solo
//! la ausencia de carreras o de temporada invalida el documento completo.

use serde_json::{Map, Value};
use tracing::debug;

use crate::models::{Circuit, Location, NormalizedSchedule, Race, SessionTime, SERIES};
use crate::utils::errors::MappingError;

const DEFAULT_LIMIT: &str = "30";
const DEFAULT_OFFSET: &str = "0";

#[derive(Debug, Clone, Copy, Default)]
pub struct RaceScheduleMapper;

impl RaceScheduleMapper {
    pub fn new() -> Self {
        Self
    }

    /// Mapea el documento crudo a la forma normalizada
    pub fn map(&self, raw: &Value) -> Result<NormalizedSchedule, MappingError> {
        let mr_data = raw.get("MRData");
        let race_table = mr_data.and_then(|d| d.get("RaceTable"));

        let raw_races = race_table
            .and_then(|t| t.get("Races"))
            .and_then(Value::as_array)
            .ok_or(MappingError::NoRaces)?;

        let season = scalar(race_table.and_then(|t| t.get("season")))
            .ok_or(MappingError::SeasonUndefined)?;

        let field = |name: &str| mr_data.and_then(|d| d.get(name));

        let races: Vec<Race> = raw_races.iter().filter_map(map_race).collect();
        if races.len() < raw_races.len() {
            debug!(
                "🧹 {} carreras descartadas por datos incompletos (temporada {})",
                raw_races.len() - races.len(),
                season
            );
        }

        Ok(NormalizedSchedule {
            series: SERIES.to_string(),
            limit: scalar(field("limit")).unwrap_or_else(|| DEFAULT_LIMIT.to_string()),
            offset: scalar(field("offset")).unwrap_or_else(|| DEFAULT_OFFSET.to_string()),
            total: numeric(field("total")).unwrap_or(0),
            season,
            races,
        })
    }
}

/// Mapea una carrera; `None` si le falta algún campo obligatorio
fn map_race(race: &Value) -> Option<Race> {
    let race = race.as_object()?;
    let circuit = race.get("Circuit").and_then(Value::as_object).filter(|c| !c.is_empty())?;

    Some(Race {
        season: scalar(race.get("season"))?,
        round: scalar(race.get("round"))?,
        url: scalar(race.get("url"))?,
        race_name: scalar(race.get("raceName"))?,
        circuit: map_circuit(circuit),
        date: scalar(race.get("date")),
        time: scalar(race.get("time")),
        first_practice: map_session(race.get("FirstPractice")),
        second_practice: map_session(race.get("SecondPractice")),
        third_practice: map_session(race.get("ThirdPractice")),
        qualifying: map_session(race.get("Qualifying")),
    })
}

fn map_circuit(circuit: &Map<String, Value>) -> Circuit {
    Circuit {
        circuit_id: scalar(circuit.get("circuitId")),
        url: scalar(circuit.get("url")),
        circuit_name: scalar(circuit.get("circuitName")),
        location: map_location(circuit.get("Location")),
    }
}

fn map_location(location: Option<&Value>) -> Location {
    let Some(location) = location.and_then(Value::as_object) else {
        return Location::default();
    };

    Location {
        lat: scalar(location.get("lat")),
        long: scalar(location.get("long")),
        locality: scalar(location.get("locality")),
        country: scalar(location.get("country")),
    }
}

/// Una sesión solo existe si trae fecha y hora
fn map_session(session: Option<&Value>) -> Option<SessionTime> {
    let session = session?.as_object()?;
    Some(SessionTime {
        date: scalar(session.get("date"))?,
        time: scalar(session.get("time"))?,
    })
}

/// Valor escalar como texto; `null`, objetos, listas y booleanos cuentan como ausentes
fn scalar(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

/// Entero a partir de un número o de un texto numérico (se trunca la parte decimal)
fn numeric(value: Option<&Value>) -> Option<i64> {
    match value? {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().map(|f| f.trunc() as i64)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>().ok().or_else(|| {
                s.parse::<f64>()
                    .ok()
                    .filter(|f| f.is_finite())
                    .map(|f| f.trunc() as i64)
            })
        }
        _ => None,
    }
}
