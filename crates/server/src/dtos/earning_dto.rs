use chrono::{DateTime, Utc};
use database::{
    referral_earning::model::{ReferralEarning, ReferralEarningOverride},
    user::model::User,
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

/// 多级推荐收益记录
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEarningResponse {
    pub user: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_full_name: Option<String>,
    pub level1_count: u64,
    pub level2_count: u64,
    pub level3_count: u64,
    pub level1_earnings: i64,
    pub level2_earnings: i64,
    pub level3_earnings: i64,
    pub total_earnings: i64,
    pub is_manually_edited: bool,
    pub notes: Option<String>,
    pub last_calculated_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ReferralEarningResponse {
    pub fn with_user(mut self, user: &User) -> Self {
        self.user_email = Some(user.email.clone());
        self.user_full_name = Some(user.full_name.clone());
        self
    }
}

impl From<ReferralEarning> for ReferralEarningResponse {
    fn from(record: ReferralEarning) -> Self {
        Self {
            user: record.user.to_hex(),
            user_email: None,
            user_full_name: None,
            level1_count: record.level1_count,
            level2_count: record.level2_count,
            level3_count: record.level3_count,
            level1_earnings: record.level1_earnings,
            level2_earnings: record.level2_earnings,
            level3_earnings: record.level3_earnings,
            total_earnings: record.total_earnings,
            is_manually_edited: record.is_manually_edited,
            notes: record.notes,
            last_calculated_at: record.last_calculated_at,
            updated_at: record.updated_at,
        }
    }
}

/// 当前各层级奖励配置
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct LevelPayoutsResponse {
    pub level1: i64,
    pub level2: i64,
    pub level3: i64,
}

/// 用户自己的收益概览
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct MyEarningsResponse {
    /// 可提现余额
    pub balance: i64,
    pub multilevel: ReferralEarningResponse,
    pub payouts: LevelPayoutsResponse,
}

/// 管理员手动调整收益
#[derive(Clone, Serialize, Deserialize, Debug, Validate, Default, ToSchema)]
#[serde(rename_all = "camelCase")]
#[validate(schema(function = "validate_has_changes"))]
pub struct UpdateEarningDto {
    #[validate(range(min = 0))]
    pub level1_earnings: Option<i64>,
    #[validate(range(min = 0))]
    pub level2_earnings: Option<i64>,
    #[validate(range(min = 0))]
    pub level3_earnings: Option<i64>,
    #[validate(length(max = 500))]
    pub notes: Option<String>,
}

fn validate_has_changes(dto: &UpdateEarningDto) -> Result<(), ValidationError> {
    if dto.level1_earnings.is_none() && dto.level2_earnings.is_none() && dto.level3_earnings.is_none() && dto.notes.is_none()
    {
        return Err(ValidationError::new("no_changes"));
    }
    Ok(())
}

impl From<UpdateEarningDto> for ReferralEarningOverride {
    fn from(dto: UpdateEarningDto) -> Self {
        Self {
            level1_earnings: dto.level1_earnings,
            level2_earnings: dto.level2_earnings,
            level3_earnings: dto.level3_earnings,
            notes: dto.notes,
        }
    }
}

/// 全量重算结果
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct RecalculationSummary {
    /// 参与计算的用户数
    pub processed: u64,
    /// 实际发生变化并写回的记录数
    pub updated: u64,
    /// 保留了手动收益的记录数
    pub preserved_overrides: u64,
    pub duration_ms: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_update_earning_requires_a_change() {
        assert!(UpdateEarningDto::default().validate().is_err());

        let dto = UpdateEarningDto {
            level2_earnings: Some(500),
            ..Default::default()
        };
        assert!(dto.validate().is_ok());

        let dto = UpdateEarningDto {
            level1_earnings: Some(-1),
            ..Default::default()
        };
        assert!(dto.validate().is_err());
    }

    #[test]
    fn test_response_from_record() {
        let user = mongodb::bson::oid::ObjectId::new();
        let mut record = ReferralEarning::empty(user);
        record.level1_count = 3;
        record.level1_earnings = 8400;
        record.total_earnings = 8400;

        let value = serde_json::to_value(ReferralEarningResponse::from(record)).unwrap();
        assert_eq!(value["user"], user.to_hex());
        assert_eq!(value["level1Count"], 3);
        assert_eq!(value["totalEarnings"], 8400);
        assert!(value.get("userEmail").is_none());
    }
}
