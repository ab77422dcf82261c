pub mod admin_dto;
pub mod earning_dto;
pub mod payment_dto;
pub mod user_dto;
pub mod video_dto;
pub mod withdrawal_dto;
