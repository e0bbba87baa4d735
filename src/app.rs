// Application state and configuration
use std::sync::Arc;

use crate::{
    db::DieselPool,
    services::{
        DriveClient, JwtService, LedgerService, MediaGenClient, NetsClient, PayPalClient,
        SubscriptionService,
    },
};

// Application state shared across handlers
#[derive(Clone)]
pub struct AppState {
    pub diesel_pool: DieselPool,
    pub jwt_service: Arc<JwtService>,
    pub ledger: LedgerService,
    pub subscription_service: Arc<SubscriptionService>,
    pub media_gen: Arc<MediaGenClient>,
    pub paypal: Arc<PayPalClient>,
    pub nets: Arc<NetsClient>,
    pub drive: Arc<DriveClient>,
    pub max_connections: u32,
}
