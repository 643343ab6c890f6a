//! End-to-end tests for the auth service, exercising the full router with an
//! in-memory credential store.


#[cfg(test)]
mod auth_flow;

#[cfg(test)]
mod rate_limiting;

#[cfg(test)]
mod session_gate;
