pub mod change_detector;
pub mod notification_service;
pub mod price_check_service;
