// SPDX-FileCopyrightText: 2025 Joost van der Laan <joost@fashionunited.com>
//
// SPDX-License-Identifier: AGPL-3.0-only

use crate::config::GatewayConfig;
use crate::gateway::JobGateway;

/// Application state shared across all routes
#[derive(Clone)]
pub struct AppState {
    pub gateway: JobGateway,
    pub config: GatewayConfig,
}

impl AppState {
    pub fn new(gateway: JobGateway, config: GatewayConfig) -> Self {
        Self { gateway, config }
    }
}
