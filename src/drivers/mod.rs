pub mod bank;
#[cfg(target_os = "espidf")]
pub mod ledc;
pub mod pwm;
pub mod servo;
