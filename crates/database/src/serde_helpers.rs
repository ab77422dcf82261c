use serde::{Serialize, Serializer};

/// 将i64强制序列化为BSON数值类型（而非NumberLong包装）
pub fn serialize_i64_as_number<S>(value: &i64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if *value <= i32::MAX as i64 && *value >= i32::MIN as i64 {
        (*value as i32).serialize(serializer)
    } else {
        value.serialize(serializer)
    }
}

/// 将u64计数序列化为BSON数值类型
pub fn serialize_u64_as_number<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    if *value <= i32::MAX as u64 {
        (*value as i32).serialize(serializer)
    } else if *value <= i64::MAX as u64 {
        (*value as i64).serialize(serializer)
    } else {
        value.serialize(serializer)
    }
}

/// 自定义日期时间反序列化器，兼容字符串和MongoDB日期对象格式
///
/// 插入时文档按 serde 默认规则写入 RFC3339 字符串，而 `$set` 更新写入的是 BSON Date，
/// 两种格式都需要能读回来。
pub mod flexible_datetime {
    use chrono::{DateTime, Utc};
    use mongodb::bson;
    use serde::{Deserialize, Deserializer};

    fn from_bson<E: serde::de::Error>(value: bson::Bson) -> Result<DateTime<Utc>, E> {
        match value {
            bson::Bson::String(s) => s
                .parse::<DateTime<Utc>>()
                .map_err(|e| E::custom(format!("Failed to parse datetime string '{}': {}", s, e))),
            bson::Bson::DateTime(dt) => {
                DateTime::<Utc>::from_timestamp_millis(dt.timestamp_millis()).ok_or_else(|| E::custom("Invalid timestamp"))
            }
            other => Err(E::custom(format!(
                "Expected datetime string or BSON DateTime, found: {:?}",
                other
            ))),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = bson::Bson::deserialize(deserializer)?;
        from_bson(value)
    }

    pub fn deserialize_option<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        match Option::<bson::Bson>::deserialize(deserializer)? {
            None | Some(bson::Bson::Null) => Ok(None),
            Some(value) => from_bson(value).map(Some),
        }
    }
}
