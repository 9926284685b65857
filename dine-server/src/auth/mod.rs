//! 认证模块
//!
//! Table QR tokens. Staff and customer credentials are verified upstream
//! and reach the engine as a [`shared::Actor`].

mod qr;

pub use qr::{QrClaims, QrError, QrTokenConfig, QrTokenService};
