pub mod broadcast_service;
pub mod confirmation;
pub mod format;
pub mod reminder_service;
pub mod routing;
