pub mod address;
pub mod cart;
pub mod catalog;
pub mod checkout;
pub mod profile;
pub mod search;

pub use address::{AddressState, AddressViewModel};
pub use cart::{CartState, CartViewModel};
pub use catalog::{CatalogState, CatalogViewModel};
pub use checkout::{CheckoutState, CheckoutViewModel};
pub use profile::{ProfileState, ProfileViewModel};
pub use search::{SearchState, SearchViewModel};
