//! Purchase client for an NFT storefront on the Ronin chain family.
//!
//! Takes a signed purchase order (a `{request, signature}` JSON payload
//! produced by the storefront's order-signing service), validates it, and
//! settles it on-chain in ERC-20 terms: check the store's allowance, approve
//! exactly the order total when it falls short, then call the store
//! contract's `executePurchase`.
//!
//! The crate splits along those seams:
//! - [`payload`] and [`types`]: parsing, exact-integer pricing, business-rule
//!   validation.
//! - [`store`]: the on-chain surface (ERC-20 allowance/approve, the store
//!   contract call).
//! - [`checkout`]: the one-at-a-time state machine driving allowance,
//!   approval, and purchase, reporting progress as events.
//! - [`session`]: the signing wallet and its RPC provider.
//! - [`network`] and [`config`]: supported chains, known deployments, and
//!   the CLI/env configuration surface.

pub mod checkout;
pub mod config;
pub mod network;
pub mod payload;
pub mod session;
pub mod store;
pub mod types;
pub mod util;
