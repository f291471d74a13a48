pub mod analytics;
pub mod applications;
pub mod backup;
pub mod calendar;
pub mod enrollment;
pub mod export;
