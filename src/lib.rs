//! Offers is a microservice responsible for coupons, their voucher codes and
//! the assignment of those codes to learners.
//! The layered structure of the app is
//!
//! `Application -> Controller -> Service -> Repo + NotificationsQueue + PaymentClients`
//!
//! Each layer can throw Error with context or cover occurred error with
//! Error in the context. When error is not covered with Error it will
//! be translated to code 500 in the http answer "Internal server error" of microservice.

#![allow(proc_macro_derive_resolution_fallback)]
#![recursion_limit = "128"]
extern crate chrono;
extern crate config as config_crate;
#[macro_use]
extern crate diesel;
#[macro_use]
extern crate failure;
extern crate futures;
extern crate futures_cpupool;
extern crate hex;
extern crate hmac;
extern crate hyper;
#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
extern crate r2d2;
extern crate regex;
extern crate reqwest;
extern crate serde;
#[macro_use]
extern crate serde_derive;
#[macro_use]
extern crate serde_json;
#[macro_use]
extern crate sentry;
extern crate sha2;
extern crate tokio_core;
extern crate tokio_signal;
extern crate tracing_subscriber;
extern crate url;
extern crate uuid;
extern crate validator;
#[macro_use]
extern crate validator_derive;

#[macro_use]
pub mod macros;
pub mod config;
pub mod controller;
pub mod errors;
pub mod logging;
pub mod models;
pub mod notifications;
pub mod payments;
pub mod repos;
pub mod schema;
pub mod sentry_integration;
pub mod services;

use std::net::SocketAddr;
use std::process;
use std::sync::Arc;
use std::time::Duration;

use diesel::pg::PgConnection;
use diesel::r2d2::ConnectionManager;
use futures::{future, Future, Stream};
use futures_cpupool::CpuPool;
use hyper::server::Http;
use r2d2::Pool;
use tokio_core::reactor::{Core, Handle};

use config::Config;
use controller::application::Application;
use controller::context::StaticContext;
use controller::ControllerImpl;
use notifications::{ChannelNotificationsQueue, NotificationsQueue, NotificationsWorkerContext};
use payments::PaymentClients;
use repos::repo_factory::ReposFactoryImpl;

type PgStaticContext = StaticContext<PgConnection, ConnectionManager<PgConnection>, ReposFactoryImpl>;

/// Starts new web service from provided `Config`
pub fn start_server<F: FnOnce() + 'static>(config: Config, port: &Option<String>, callback: F) {
    let mut core = Core::new().expect("Unexpected error creating event loop core");
    let handle = core.handle();

    let address: SocketAddr = {
        let port = port.as_ref().unwrap_or(&config.server.port);
        format!("{}:{}", config.server.host, port).parse().expect("Could not parse address")
    };
    let thread_count = config.server.thread_count;

    let notifications = spawn_notifications_worker(&config, &handle);
    let context = create_static_context(config, notifications);
    serve(&address, &handle, context);

    info!("Offers service is listening on http://{}, threads: {}", address, thread_count);
    handle.spawn_fn(move || {
        callback();
        future::ok(())
    });

    core.run(tokio_signal::ctrl_c().flatten_stream().take(1u64).for_each(|()| {
        info!("Ctrl+C received. Exit");
        Ok(())
    })).unwrap();
}

/// Runs the delivery worker on the reactor and returns the queue feeding it
fn spawn_notifications_worker(config: &Config, handle: &Handle) -> Arc<dyn NotificationsQueue> {
    let (queue, receiver) = ChannelNotificationsQueue::new();
    let worker_context = NotificationsWorkerContext::new(
        config.notifications.url.clone(),
        Duration::from_secs(config.notifications.timeout_s),
    ).expect("Failed to create notifications http client");
    handle.spawn(notifications::run(worker_context, receiver));
    Arc::new(queue)
}

fn create_static_context(config: Config, notifications: Arc<dyn NotificationsQueue>) -> PgStaticContext {
    let db_manager = ConnectionManager::<PgConnection>::new(config.server.database.clone());
    let db_pool = Pool::builder()
        .build(db_manager)
        .expect("Failed to create DB connection pool");
    let cpu_pool = CpuPool::new(config.server.thread_count);
    let payments = PaymentClients::from_config(&config).expect("Failed to create payment http clients");

    StaticContext::new(db_pool, cpu_pool, Arc::new(config), ReposFactoryImpl::new(), notifications, payments)
}

fn serve(address: &SocketAddr, handle: &Handle, context: PgStaticContext) {
    let server = Http::new()
        .serve_addr_handle(address, handle, move || Ok(Application::new(ControllerImpl::new(context.clone()))))
        .unwrap_or_else(|why| {
            error!("Http Server Initialization Error: {}", why);
            process::exit(1);
        });

    let conn_handle = handle.clone();
    handle.spawn(
        server
            .for_each(move |conn| {
                conn_handle.spawn(conn.map(|_| ()).map_err(|why| error!("Server Error: {}", why)));
                Ok(())
            }).map_err(|e| error!("Server stopped accepting connections: {}", e)),
    );
}
