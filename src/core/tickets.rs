use crate::domain::model::{Ticket, TicketId, TicketKind, TicketStatus};
use crate::domain::ports::TicketBackend;
use crate::utils::error::{Result, StocktakeError};
use std::sync::Arc;

/// 出庫、銷售、生產單的審核
pub struct TicketReview<B: TicketBackend> {
    backend: Arc<B>,
}

impl<B: TicketBackend> TicketReview<B> {
    pub fn new(backend: Arc<B>) -> Self {
        Self { backend }
    }

    pub async fn pending(&self, kind: Option<TicketKind>) -> Result<Vec<Ticket>> {
        let tickets = self
            .backend
            .list_tickets(Some(TicketStatus::Pending), kind)
            .await?;
        // 後端忽略篩選參數時也只回傳待審核的單
        Ok(tickets
            .into_iter()
            .filter(|t| t.status == TicketStatus::Pending)
            .filter(|t| kind.map_or(true, |k| t.kind == k))
            .collect())
    }

    async fn find_pending(&self, ticket_id: TicketId) -> Result<Ticket> {
        let tickets = self.backend.list_tickets(None, None).await?;
        let ticket = tickets
            .into_iter()
            .find(|t| t.id == ticket_id)
            .ok_or_else(|| StocktakeError::validation(format!("Ticket {} not found", ticket_id)))?;
        if ticket.status != TicketStatus::Pending {
            return Err(StocktakeError::validation(format!(
                "Ticket {} is already {}",
                ticket_id,
                ticket.status.as_str()
            )));
        }
        Ok(ticket)
    }

    pub async fn approve(&self, ticket_id: TicketId) -> Result<Ticket> {
        self.find_pending(ticket_id).await?;
        let ticket = self.backend.approve_ticket(ticket_id).await?;
        tracing::info!("✅ Ticket {} approved", ticket_id);
        Ok(ticket)
    }

    pub async fn reject(&self, ticket_id: TicketId, reason: &str) -> Result<Ticket> {
        if reason.trim().is_empty() {
            return Err(StocktakeError::validation("A reason is required to reject a ticket"));
        }
        self.find_pending(ticket_id).await?;
        let ticket = self.backend.reject_ticket(ticket_id, reason.trim()).await?;
        tracing::info!("🚫 Ticket {} rejected", ticket_id);
        Ok(ticket)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use chrono::Utc;
    use tokio::sync::Mutex;

    struct MockTickets {
        tickets: Mutex<Vec<Ticket>>,
    }

    fn ticket(id: i64, kind: TicketKind, status: TicketStatus) -> Ticket {
        Ticket {
            id,
            kind,
            status,
            created_by: Some("clerk".to_string()),
            created_at: Utc::now(),
            comment: None,
        }
    }

    #[async_trait]
    impl TicketBackend for MockTickets {
        async fn list_tickets(
            &self,
            _status: Option<TicketStatus>,
            _kind: Option<TicketKind>,
        ) -> Result<Vec<Ticket>> {
            Ok(self.tickets.lock().await.clone())
        }

        async fn approve_ticket(&self, ticket_id: TicketId) -> Result<Ticket> {
            let mut tickets = self.tickets.lock().await;
            let t = tickets.iter_mut().find(|t| t.id == ticket_id).unwrap();
            t.status = TicketStatus::Approved;
            Ok(t.clone())
        }

        async fn reject_ticket(&self, ticket_id: TicketId, reason: &str) -> Result<Ticket> {
            let mut tickets = self.tickets.lock().await;
            let t = tickets.iter_mut().find(|t| t.id == ticket_id).unwrap();
            t.status = TicketStatus::Rejected;
            t.comment = Some(reason.to_string());
            Ok(t.clone())
        }
    }

    fn review() -> TicketReview<MockTickets> {
        TicketReview::new(Arc::new(MockTickets {
            tickets: Mutex::new(vec![
                ticket(1, TicketKind::WriteOff, TicketStatus::Pending),
                ticket(2, TicketKind::Sale, TicketStatus::Pending),
                ticket(3, TicketKind::Sale, TicketStatus::Approved),
            ]),
        }))
    }

    #[tokio::test]
    async fn test_pending_filters_client_side() {
        let review = review();
        assert_eq!(review.pending(None).await.unwrap().len(), 2);
        let sales = review.pending(Some(TicketKind::Sale)).await.unwrap();
        assert_eq!(sales.len(), 1);
        assert_eq!(sales[0].id, 2);
    }

    #[tokio::test]
    async fn test_only_pending_tickets_can_be_approved() {
        let review = review();
        assert_eq!(review.approve(1).await.unwrap().status, TicketStatus::Approved);
        assert!(review.approve(1).await.is_err());
        assert!(review.approve(3).await.is_err());
        assert!(review.approve(99).await.is_err());
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let review = review();
        assert!(review.reject(2, "  ").await.is_err());
        let rejected = review.reject(2, " damaged ").await.unwrap();
        assert_eq!(rejected.status, TicketStatus::Rejected);
        assert_eq!(rejected.comment.as_deref(), Some("damaged"));
    }
}
