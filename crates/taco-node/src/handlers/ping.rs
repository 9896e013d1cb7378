//! `GET /ping` — echoes the caller's observed address back as plain text,
//! so a node starting up behind NAT can discover the address peers
//! actually see it connect from.

use axum::extract::ConnectInfo;
use std::net::SocketAddr;

pub async fn ping(ConnectInfo(addr): ConnectInfo<SocketAddr>) -> String {
    addr.ip().to_string()
}
