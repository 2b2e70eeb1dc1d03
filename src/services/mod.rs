//! Services module
//!
//! Este módulo contiene la lógica del pipeline del calendario: cliente HTTP
//! con reintentos, mapeo defensivo del documento y el servicio que los
//! compone sobre el cache.

pub mod http_client;
pub mod race_schedule_mapper;
pub mod race_schedule_service;

pub use http_client::{HttpClient, HttpClientAdapter, ReqwestTransport, RetryPolicy, Transport};
pub use race_schedule_mapper::RaceScheduleMapper;
pub use race_schedule_service::{RaceScheduleConfig, RaceScheduleService, CACHE_KEY};
