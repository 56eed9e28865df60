//! Offers is a microservice responsible for coupons and assignment of their codes.
//! This crate is for running the service from `offers_lib`. See `offers_lib` for details.

extern crate offers_lib;

fn main() {
    let config = offers_lib::config::Config::new().expect("Can't load app config!");

    // Prepare logger
    offers_lib::logging::init(&config.logging);

    // Prepare sentry integration
    let _sentry = offers_lib::sentry_integration::init(config.sentry.as_ref());

    offers_lib::start_server(config, &None, || ());
}
