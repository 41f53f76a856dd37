pub mod cron;
pub mod interfaces;
pub mod mappers;
pub mod systemd;
