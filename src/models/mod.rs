// Database models
pub mod cart;
pub mod generation;
pub mod order;
pub mod review;
pub mod subscription;
pub mod ticket;
pub mod user;

pub use cart::{CartItem, CartLine, NewCartItem};
pub use generation::{GenerationRecord, MediaKind, NewGenerationRecord};
pub use order::{NewOrderItem, OrderItem};
pub use review::{NewReview, Review, ReviewStats};
pub use subscription::{NewSubscription, Subscription};
pub use ticket::{Category, NewCategory, NewTicket, Ticket, TicketUpdate};
pub use user::{NewUser, User, UserUpdate};
