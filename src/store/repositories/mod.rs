pub mod addresses;
pub mod auth;
pub mod cart;
pub mod favorites;
pub mod orders;
pub mod products;
pub mod profiles;
pub mod search_history;

pub use addresses::AddressRepository;
pub use auth::AuthRepository;
pub use cart::CartRepository;
pub use favorites::FavoritesRepository;
pub use orders::{OrderRepository, order_total};
pub use products::ProductRepository;
pub use profiles::ProfileRepository;
pub use search_history::SearchHistoryRepository;
