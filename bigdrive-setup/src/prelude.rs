pub(crate) type Result<T> = anyhow::Result<T>;
pub(crate) use bigdrive_common::prelude::*;
