use crate::prelude::*;
use bigdrive_common::config;
use futures::{future, prelude::*};
use tarpc::{
    server::{self, incoming::Incoming, Channel},
    tokio_serde::formats::Json,
};

mod hosting;
mod prelude;
mod provision;
mod service;

pub(crate) async fn spawn(fut: impl Future<Output = ()> + Send + 'static) {
    tokio::spawn(fut);
}
#[tokio::main]
async fn main() -> Result<()> {
    bigdrive_common::tracing_setup::init_tracing();
    let config = config::load_config()?;
    service::start(&config).await?;
    Ok(())
}
