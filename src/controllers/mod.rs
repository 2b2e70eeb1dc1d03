pub mod race_schedule_controller;
