pub mod guide;
pub mod modal;
pub mod navigation;
pub mod payment_coordinator;
pub mod plans;
pub mod profile_service;
pub mod settings_service;
pub mod skeleton;
