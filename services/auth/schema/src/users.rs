use sea_orm::entity::prelude::*;

/// User credential record owned by the auth service.
/// Emails are stored lowercase; uniqueness is enforced on the normalized form.
/// `totp_secret` is ChaCha20-Poly1305 ciphertext (nonce prepended) and is
/// present from provisioning on, while `two_factor_enabled` only flips once
/// enrollment completes. `last_totp_step` is the replay guard: the highest
/// 30-second time step a code has been accepted for.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "users")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    #[sea_orm(unique)]
    pub email: String,
    pub password_hash: String,
    pub two_factor_enabled: bool,
    pub totp_secret: Option<Vec<u8>>,
    pub last_totp_step: Option<i64>,
    pub created_at: chrono::DateTime<chrono::Utc>,
    pub updated_at: chrono::DateTime<chrono::Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sessions::Entity")]
    Sessions,
    #[sea_orm(has_many = "super::backup_codes::Entity")]
    BackupCodes,
    #[sea_orm(has_many = "super::password_reset_tokens::Entity")]
    PasswordResetTokens,
}

impl Related<super::sessions::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Sessions.def()
    }
}

impl Related<super::backup_codes::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::BackupCodes.def()
    }
}

impl Related<super::password_reset_tokens::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::PasswordResetTokens.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}
