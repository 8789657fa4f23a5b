pub mod bigdrive_service;
