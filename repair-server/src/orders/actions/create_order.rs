//! CreateOrder command handler
//!
//! Opens a new service order in `AwaitingInitialization` with a fresh
//! branch folio.

use async_trait::async_trait;

use super::line_items::resolve_line_items;
use crate::orders::traits::{CommandContext, CommandHandler, CommandMetadata, OrderError};
use shared::order::{EventPayload, LineItemInput, OrderEvent, OrderEventType, ServiceKind};

/// CreateOrder action
#[derive(Debug, Clone)]
pub struct CreateOrderAction {
    pub branch: String,
    pub service_kind: ServiceKind,
    pub reported_problem: String,
    pub client_id: String,
    pub equipment_id: String,
    pub technician_id: Option<String>,
    pub items: Vec<LineItemInput>,
}

fn required(value: &str, field: &str) -> Result<String, OrderError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(OrderError::InvalidOperation(format!("{field} is required")));
    }
    Ok(trimmed.to_string())
}

#[async_trait]
impl CommandHandler for CreateOrderAction {
    async fn execute(
        &self,
        ctx: &mut CommandContext<'_>,
        metadata: &CommandMetadata,
    ) -> Result<Vec<OrderEvent>, OrderError> {
        // 1. Validate intake fields
        let branch = required(&self.branch, "branch")?.to_uppercase();
        let reported_problem = required(&self.reported_problem, "reported_problem")?;
        let client_id = required(&self.client_id, "client_id")?;
        let equipment_id = required(&self.equipment_id, "equipment_id")?;

        // 2. Specific-service orders are priced upfront
        if self.service_kind == ServiceKind::SpecificService && self.items.is_empty() {
            return Err(OrderError::InvalidOperation(
                "specific-service orders need at least one catalog item".to_string(),
            ));
        }
        let line_items = resolve_line_items(ctx, &self.items)?;
        let diagnosis_fee = match self.service_kind {
            ServiceKind::Diagnosis => ctx.policy().diagnosis_fee,
            ServiceKind::SpecificService => 0.0,
        };

        // 3. Allocate identity
        let order_id = uuid::Uuid::new_v4().to_string();
        let folio = ctx.next_folio(&branch)?;
        let seq = ctx.next_sequence();

        tracing::debug!(order_id = %order_id, folio = %folio, kind = %self.service_kind, "Opening order");

        let event = OrderEvent::new(
            seq,
            order_id,
            metadata.actor_id.clone(),
            metadata.actor_name.clone(),
            metadata.command_id.clone(),
            Some(metadata.timestamp),
            OrderEventType::OrderCreated,
            EventPayload::OrderCreated {
                folio,
                service_kind: self.service_kind,
                branch,
                reported_problem,
                client_id,
                equipment_id,
                technician_id: self.technician_id.clone(),
                line_items,
                diagnosis_fee,
            },
        );

        Ok(vec![event])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::orders::ledger::LedgerPolicy;
    use crate::orders::storage::OrderStorage;
    use shared::order::Role;

    fn create_test_metadata() -> CommandMetadata {
        CommandMetadata {
            command_id: "cmd-1".to_string(),
            actor_id: "rec-1".to_string(),
            actor_name: "Reception".to_string(),
            role: Role::Reception,
            timestamp: 1234567890,
        }
    }

    fn diagnosis_action(branch: &str) -> CreateOrderAction {
        CreateOrderAction {
            branch: branch.to_string(),
            service_kind: ServiceKind::Diagnosis,
            reported_problem: "Laptop does not boot".to_string(),
            client_id: "client-1".to_string(),
            equipment_id: "eq-1".to_string(),
            technician_id: None,
            items: vec![],
        }
    }

    #[tokio::test]
    async fn test_create_order_generates_event_with_folio() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let events = diagnosis_action(" centro ")
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert_eq!(events.len(), 1);
        assert_eq!(events[0].sequence, 1);
        if let EventPayload::OrderCreated { folio, branch, .. } = &events[0].payload {
            assert_eq!(folio, "CENTRO-000001");
            assert_eq!(branch, "CENTRO");
        } else {
            panic!("Expected OrderCreated payload");
        }
    }

    #[tokio::test]
    async fn test_folio_increments_per_branch() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);
        let metadata = create_test_metadata();

        diagnosis_action("CENTRO").execute(&mut ctx, &metadata).await.unwrap();
        let second = diagnosis_action("CENTRO").execute(&mut ctx, &metadata).await.unwrap();
        let other = diagnosis_action("NORTE").execute(&mut ctx, &metadata).await.unwrap();

        assert!(matches!(
            &second[0].payload,
            EventPayload::OrderCreated { folio, .. } if folio == "CENTRO-000002"
        ));
        assert!(matches!(
            &other[0].payload,
            EventPayload::OrderCreated { folio, .. } if folio == "NORTE-000001"
        ));
    }

    #[tokio::test]
    async fn test_specific_service_requires_items() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut action = diagnosis_action("CENTRO");
        action.service_kind = ServiceKind::SpecificService;
        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_blank_problem_rejected() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let mut ctx = CommandContext::new(&txn, &storage, 0);

        let mut action = diagnosis_action("CENTRO");
        action.reported_problem = "   ".to_string();
        let result = action.execute(&mut ctx, &create_test_metadata()).await;
        assert!(matches!(result, Err(OrderError::InvalidOperation(_))));
    }

    #[tokio::test]
    async fn test_diagnosis_fee_taken_from_branch_policy() {
        let storage = OrderStorage::open_in_memory().unwrap();
        let txn = storage.begin_write().unwrap();
        let policy = LedgerPolicy {
            diagnosis_fee: 150.0,
            ..Default::default()
        };
        let mut ctx = CommandContext::new(&txn, &storage, 0).with_policy(policy);

        let events = diagnosis_action("CENTRO")
            .execute(&mut ctx, &create_test_metadata())
            .await
            .unwrap();

        assert!(matches!(
            &events[0].payload,
            EventPayload::OrderCreated { diagnosis_fee, .. } if *diagnosis_fee == 150.0
        ));
    }
}
