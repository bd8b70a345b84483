pub mod holiday_source;
pub mod task_spawner;
pub mod time_service;
