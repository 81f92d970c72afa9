mod svr;

pub use svr::{CancelResponse, StartRequest, StartResponse, app_for, create_app, startup};
