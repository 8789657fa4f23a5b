use lazy_static::lazy_static;
lazy_static!(
    pub static ref PROJECT_DIRS: directories::ProjectDirs = directories::ProjectDirs::from("com", "BigDrive", "bigdrive").expect(
        "A home directory is required to place the hive and the event logs.",
    );
);
