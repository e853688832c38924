use anyhow::anyhow;
use deadpool_redis::Pool;
use deadpool_redis::redis::AsyncCommands;
use uuid::Uuid;

use crate::domain::repository::TwoFactorCache;
use crate::domain::types::{ENROLLMENT_STATE_TTL_SECS, EnrollmentStep, PENDING_TICKET_TTL_SECS};
use crate::error::AuthServiceError;

#[derive(Clone)]
pub struct RedisTwoFactorCache {
    pub pool: Pool,
}

fn pending_ticket_key(ticket: &str) -> String {
    format!("pending_2fa:{ticket}")
}

fn enrollment_key(user_id: Uuid) -> String {
    format!("totp_enroll:{user_id}")
}

impl RedisTwoFactorCache {
    async fn conn(&self) -> Result<deadpool_redis::Connection, AuthServiceError> {
        self.pool
            .get()
            .await
            .map_err(|e| AuthServiceError::Storage(e.into()))
    }
}

impl TwoFactorCache for RedisTwoFactorCache {
    async fn put_pending_ticket(
        &self,
        ticket: &str,
        user_id: Uuid,
    ) -> Result<(), AuthServiceError> {
        let mut conn = self.conn().await?;
        let (): () = conn
            .set_ex(
                pending_ticket_key(ticket),
                user_id.to_string(),
                PENDING_TICKET_TTL_SECS,
            )
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Storage(e.into()))?;
        Ok(())
    }

    async fn peek_pending_ticket(&self, ticket: &str) -> Result<Option<Uuid>, AuthServiceError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(pending_ticket_key(ticket))
            .await
            .map_err(|e| AuthServiceError::Storage(e.into()))?;
        value
            .map(|v| {
                v.parse::<Uuid>()
                    .map_err(|_| AuthServiceError::Storage(anyhow!("corrupt pending ticket value")))
            })
            .transpose()
    }

    async fn take_pending_ticket(&self, ticket: &str) -> Result<Option<Uuid>, AuthServiceError> {
        let mut conn = self.conn().await?;
        // GETDEL: the single-use guarantee for tickets.
        let value: Option<String> = conn
            .get_del(pending_ticket_key(ticket))
            .await
            .map_err(|e| AuthServiceError::Storage(e.into()))?;
        value
            .map(|v| {
                v.parse::<Uuid>()
                    .map_err(|_| AuthServiceError::Storage(anyhow!("corrupt pending ticket value")))
            })
            .transpose()
    }

    async fn put_enrollment_step(
        &self,
        user_id: Uuid,
        step: EnrollmentStep,
    ) -> Result<(), AuthServiceError> {
        let mut conn = self.conn().await?;
        let (): () = conn
            .set_ex(
                enrollment_key(user_id),
                step.as_str(),
                ENROLLMENT_STATE_TTL_SECS,
            )
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Storage(e.into()))?;
        Ok(())
    }

    async fn get_enrollment_step(
        &self,
        user_id: Uuid,
    ) -> Result<Option<EnrollmentStep>, AuthServiceError> {
        let mut conn = self.conn().await?;
        let value: Option<String> = conn
            .get(enrollment_key(user_id))
            .await
            .map_err(|e| AuthServiceError::Storage(e.into()))?;
        value
            .map(|v| {
                EnrollmentStep::parse(&v)
                    .ok_or_else(|| AuthServiceError::Storage(anyhow!("corrupt enrollment step")))
            })
            .transpose()
    }

    async fn clear_enrollment(&self, user_id: Uuid) -> Result<(), AuthServiceError> {
        let mut conn = self.conn().await?;
        let (): () = conn
            .del(enrollment_key(user_id))
            .await
            .map_err(|e: deadpool_redis::redis::RedisError| AuthServiceError::Storage(e.into()))?;
        Ok(())
    }
}
