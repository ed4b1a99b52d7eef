// Integration suites, one file per surface.
mod admin;
mod gateway;
mod server;
