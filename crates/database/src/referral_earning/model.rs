use crate::serde_helpers::{flexible_datetime, serialize_i64_as_number, serialize_u64_as_number};
use chrono::{DateTime, Utc};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

/// 多级推荐收益记录（每个用户一条，冗余存储便于后台展示）
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ReferralEarning {
    #[serde(rename = "_id", skip_serializing_if = "Option::is_none")]
    pub id: Option<ObjectId>,
    pub user: ObjectId,
    #[serde(default, serialize_with = "serialize_u64_as_number")]
    pub level1_count: u64,
    #[serde(default, serialize_with = "serialize_u64_as_number")]
    pub level2_count: u64,
    #[serde(default, serialize_with = "serialize_u64_as_number")]
    pub level3_count: u64,
    #[serde(default, serialize_with = "serialize_i64_as_number")]
    pub level1_earnings: i64,
    #[serde(default, serialize_with = "serialize_i64_as_number")]
    pub level2_earnings: i64,
    #[serde(default, serialize_with = "serialize_i64_as_number")]
    pub level3_earnings: i64,
    #[serde(default, serialize_with = "serialize_i64_as_number")]
    pub total_earnings: i64,
    /// 管理员手动修改过收益，重算时保留收益数值
    #[serde(default)]
    pub is_manually_edited: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub last_calculated_at: DateTime<Utc>,
    #[serde(deserialize_with = "flexible_datetime::deserialize")]
    pub updated_at: DateTime<Utc>,
}

impl ReferralEarning {
    /// 尚未产生任何下级的空记录
    pub fn empty(user: ObjectId) -> Self {
        let now = Utc::now();
        Self {
            id: None,
            user,
            level1_count: 0,
            level2_count: 0,
            level3_count: 0,
            level1_earnings: 0,
            level2_earnings: 0,
            level3_earnings: 0,
            total_earnings: 0,
            is_manually_edited: false,
            notes: None,
            last_calculated_at: now,
            updated_at: now,
        }
    }

    pub fn sum_levels(&self) -> i64 {
        self.level1_earnings + self.level2_earnings + self.level3_earnings
    }

    pub fn count_for(&self, level: u8) -> u64 {
        match level {
            1 => self.level1_count,
            2 => self.level2_count,
            3 => self.level3_count,
            _ => 0,
        }
    }

    pub fn earnings_for(&self, level: u8) -> i64 {
        match level {
            1 => self.level1_earnings,
            2 => self.level2_earnings,
            3 => self.level3_earnings,
            _ => 0,
        }
    }
}

/// 管理员对收益记录的修改
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ReferralEarningOverride {
    pub level1_earnings: Option<i64>,
    pub level2_earnings: Option<i64>,
    pub level3_earnings: Option<i64>,
    pub notes: Option<String>,
}

impl ReferralEarningOverride {
    /// 应用修改并重新计算总额，同时标记为手动修改
    pub fn apply(&self, record: &mut ReferralEarning) {
        if let Some(v) = self.level1_earnings {
            record.level1_earnings = v;
        }
        if let Some(v) = self.level2_earnings {
            record.level2_earnings = v;
        }
        if let Some(v) = self.level3_earnings {
            record.level3_earnings = v;
        }
        if let Some(notes) = &self.notes {
            record.notes = Some(notes.clone());
        }
        record.total_earnings = record.sum_levels();
        record.is_manually_edited = true;
        record.updated_at = Utc::now();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mongodb::bson;

    #[test]
    fn test_override_recomputes_total() {
        let mut record = ReferralEarning::empty(ObjectId::new());
        record.level1_count = 2;
        record.level1_earnings = 5600;
        record.total_earnings = 5600;

        ReferralEarningOverride {
            level2_earnings: Some(1000),
            notes: Some("bonus campaign".into()),
            ..Default::default()
        }
        .apply(&mut record);

        assert!(record.is_manually_edited);
        assert_eq!(record.level1_earnings, 5600);
        assert_eq!(record.level2_earnings, 1000);
        assert_eq!(record.total_earnings, 6600);
        assert_eq!(record.level1_count, 2);
        assert_eq!(record.notes.as_deref(), Some("bonus campaign"));
    }

    #[test]
    fn test_level_accessors() {
        let mut record = ReferralEarning::empty(ObjectId::new());
        record.level3_count = 4;
        record.level3_earnings = 2800;

        assert_eq!(record.count_for(3), 4);
        assert_eq!(record.earnings_for(3), 2800);
        assert_eq!(record.count_for(4), 0);
    }

    #[test]
    fn test_bson_round_trip_keeps_counts() {
        let mut record = ReferralEarning::empty(ObjectId::new());
        record.level2_count = 7;
        let document = bson::to_document(&record).unwrap();

        assert_eq!(document.get_i32("level2Count").unwrap(), 7);
        assert!(!document.get_bool("isManuallyEdited").unwrap());

        let back: ReferralEarning = bson::from_document(document).unwrap();
        assert_eq!(back.level2_count, 7);
    }
}
