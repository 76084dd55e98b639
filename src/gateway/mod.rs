pub mod amadeus;
pub mod offer;
pub mod traits;

pub use amadeus::AmadeusGateway;
pub use offer::RawOffer;
pub use traits::SearchGateway;
