use super::commission::{reconcile, LevelPayouts, ReferralGraph, MAX_REFERRAL_DEPTH};
use crate::dtos::earning_dto::RecalculationSummary;
use async_trait::async_trait;
use chrono::Utc;
use database::{
    referral_earning::{
        model::{ReferralEarning, ReferralEarningOverride},
        repository::DynReferralEarningRepository,
    },
    user::{
        model::{referral_bonus_reference, User},
        repository::DynUserRepository,
    },
};
use mongodb::bson::oid::ObjectId;
use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
    time::Instant,
};
use tracing::{info, warn};
use utils::{AppError, AppResult};

pub type DynReferralService = Arc<dyn ReferralServiceTrait + Send + Sync>;

#[async_trait]
pub trait ReferralServiceTrait {
    fn payouts(&self) -> LevelPayouts;

    /// 用户激活后：给直接推荐人入账一级奖励，并更新前三级上级的收益记录
    async fn on_user_activated(&self, user: &User) -> AppResult<()>;

    /// 读取收益记录，不存在时现算并落库
    async fn get_or_calculate(&self, user: &ObjectId) -> AppResult<ReferralEarning>;

    async fn list_earnings(&self) -> AppResult<Vec<(ReferralEarning, Option<User>)>>;

    async fn recalculate_user(&self, user: &ObjectId) -> AppResult<ReferralEarning>;

    async fn update_earning(&self, user: &ObjectId, update: ReferralEarningOverride) -> AppResult<ReferralEarning>;

    /// 清除手动标记并按当前推荐树重算
    async fn reset_override(&self, user: &ObjectId) -> AppResult<ReferralEarning>;

    async fn recalculate_all(&self) -> AppResult<RecalculationSummary>;

    async fn remove_user(&self, user: &ObjectId) -> AppResult<()>;
}

#[derive(Clone)]
pub struct ReferralService {
    users: DynUserRepository,
    earnings: DynReferralEarningRepository,
    payouts: LevelPayouts,
}

impl ReferralService {
    pub fn new(users: DynUserRepository, earnings: DynReferralEarningRepository, payouts: LevelPayouts) -> Self {
        Self {
            users,
            earnings,
            payouts,
        }
    }

    async fn ensure_user(&self, user: &ObjectId) -> AppResult<User> {
        self.users
            .get_user(user)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("User with id {} not found.", user)))
    }

    async fn load_graph(&self) -> AppResult<ReferralGraph> {
        let nodes = self.users.referral_nodes().await?;
        Ok(ReferralGraph::from_nodes(nodes))
    }

    /// 用给定的图重算并写回单个用户的记录
    async fn recalculate_with(
        &self,
        graph: &ReferralGraph,
        user: &ObjectId,
        existing: Option<&ReferralEarning>,
    ) -> AppResult<ReferralEarning> {
        let computed = graph.compute_for(user, &self.payouts);
        let result = reconcile(*user, existing, &computed, Utc::now());

        self.earnings.upsert_earning(&result.record).await?;

        if result.preserved_override {
            info!("✋ 用户 {} 的收益为手动设置，仅刷新人数", user);
        }

        Ok(result.record)
    }
}

#[async_trait]
impl ReferralServiceTrait for ReferralService {
    fn payouts(&self) -> LevelPayouts {
        self.payouts
    }

    async fn on_user_activated(&self, user: &User) -> AppResult<()> {
        let Some(user_id) = user.id else {
            return Err(AppError::InternalServerErrorWithContext(
                "Activated user has no id".to_string(),
            ));
        };

        let mut graph: Option<ReferralGraph> = None;
        let mut visited = HashSet::from([user_id]);
        let mut current = user.referred_by;
        let mut level: u8 = 1;
        // 直接奖励已入账说明是中断后的重放，此时按整棵树重算，避免人数重复累加
        let mut replay = false;

        while let Some(ancestor_id) = current {
            if level as usize > MAX_REFERRAL_DEPTH || !visited.insert(ancestor_id) {
                break;
            }

            let Some(ancestor) = self.users.get_user(&ancestor_id).await? else {
                warn!("⚠️ 推荐人 {} 已不存在，停止向上分成", ancestor_id);
                break;
            };

            let amount = self.payouts.for_level(level as usize);

            if level == 1 {
                if self
                    .users
                    .credit_once(&ancestor_id, &referral_bonus_reference(&user_id), amount)
                    .await?
                {
                    info!("💰 直接推荐奖励 {} 已入账: {} <- {}", amount, ancestor.email, user.email);
                } else {
                    warn!("🔁 {} 的直接推荐奖励已入账过，改为重算上级收益", user.email);
                    replay = true;
                }
            }

            match self.earnings.get_earning(&ancestor_id).await? {
                Some(record) if !replay => {
                    self.earnings
                        .increment_level(&ancestor_id, level, amount, !record.is_manually_edited)
                        .await?;
                }
                existing => {
                    // 首次出现的上级直接按整棵树计算，新激活的用户已包含在内
                    if graph.is_none() {
                        graph = Some(self.load_graph().await?);
                    }
                    if let Some(graph) = graph.as_ref() {
                        self.recalculate_with(graph, &ancestor_id, existing.as_ref()).await?;
                    }
                }
            }

            info!("🔗 第{}级推荐收益已更新: {} <- {}", level, ancestor_id, user_id);

            current = ancestor.referred_by;
            level += 1;
        }

        Ok(())
    }

    async fn get_or_calculate(&self, user: &ObjectId) -> AppResult<ReferralEarning> {
        if let Some(record) = self.earnings.get_earning(user).await? {
            return Ok(record);
        }

        self.recalculate_user(user).await
    }

    async fn list_earnings(&self) -> AppResult<Vec<(ReferralEarning, Option<User>)>> {
        let records = self.earnings.list_earnings().await?;
        let ids: Vec<ObjectId> = records.iter().map(|r| r.user).collect();

        let mut users: HashMap<ObjectId, User> = self
            .users
            .get_users_by_ids(&ids)
            .await?
            .into_iter()
            .filter_map(|u| u.id.map(|id| (id, u)))
            .collect();

        Ok(records
            .into_iter()
            .map(|record| {
                let user = users.remove(&record.user);
                (record, user)
            })
            .collect())
    }

    async fn recalculate_user(&self, user: &ObjectId) -> AppResult<ReferralEarning> {
        self.ensure_user(user).await?;

        let graph = self.load_graph().await?;
        let existing = self.earnings.get_earning(user).await?;

        self.recalculate_with(&graph, user, existing.as_ref()).await
    }

    async fn update_earning(&self, user: &ObjectId, update: ReferralEarningOverride) -> AppResult<ReferralEarning> {
        self.ensure_user(user).await?;

        if self.earnings.get_earning(user).await?.is_none() {
            self.recalculate_user(user).await?;
        }

        let record = self
            .earnings
            .apply_override(user, &update)
            .await?
            .ok_or_else(|| AppError::NotFound(format!("Earning record for user {} not found.", user)))?;

        info!("✏️ 管理员手动调整收益: {} -> total {}", user, record.total_earnings);

        Ok(record)
    }

    async fn reset_override(&self, user: &ObjectId) -> AppResult<ReferralEarning> {
        self.ensure_user(user).await?;

        let graph = self.load_graph().await?;
        let cleared = self.earnings.get_earning(user).await?.map(|mut record| {
            record.is_manually_edited = false;
            record.notes = None;
            record
        });

        let record = self.recalculate_with(&graph, user, cleared.as_ref()).await?;
        info!("♻️ 用户 {} 的手动收益已重置", user);

        Ok(record)
    }

    async fn recalculate_all(&self) -> AppResult<RecalculationSummary> {
        let started = Instant::now();
        info!("🔄 开始全量重算多级推荐收益...");

        let graph = self.load_graph().await?;
        let breakdowns = graph.compute_all(&self.payouts);

        let mut existing: HashMap<ObjectId, ReferralEarning> = self
            .earnings
            .list_earnings()
            .await?
            .into_iter()
            .map(|record| (record.user, record))
            .collect();

        let now = Utc::now();
        let mut summary = RecalculationSummary::default();

        for (user, breakdown) in &breakdowns {
            let previous = existing.remove(user);
            let result = reconcile(*user, previous.as_ref(), breakdown, now);

            self.earnings.upsert_earning(&result.record).await?;

            summary.processed += 1;
            if result.changed {
                summary.updated += 1;
            }
            if result.preserved_override {
                summary.preserved_overrides += 1;
            }
        }

        if !existing.is_empty() {
            warn!("⚠️ {} 条收益记录对应的用户已不存在", existing.len());
        }

        summary.duration_ms = started.elapsed().as_millis() as u64;
        info!(
            "✅ 全量重算完成: processed={}, updated={}, preserved={}, {}ms",
            summary.processed, summary.updated, summary.preserved_overrides, summary.duration_ms
        );

        Ok(summary)
    }

    async fn remove_user(&self, user: &ObjectId) -> AppResult<()> {
        if self.earnings.delete_earning(user).await? {
            info!("🗑️ 用户 {} 的收益记录已删除", user);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::MemoryStore;
    use database::{
        referral_earning::repository::ReferralEarningRepositoryTrait,
        user::{model::UserUpdate, repository::UserRepositoryTrait},
    };

    fn service(store: &Arc<MemoryStore>) -> ReferralService {
        ReferralService::new(store.clone(), store.clone(), LevelPayouts::default())
    }

    /// root <- a <- b <- c，全部激活
    async fn seed_chain(store: &Arc<MemoryStore>) -> Vec<ObjectId> {
        let root = store.insert_user("root@example.com", None, true).await;
        let a = store.insert_user("a@example.com", Some(root), true).await;
        let b = store.insert_user("b@example.com", Some(a), true).await;
        let c = store.insert_user("c@example.com", Some(b), true).await;
        vec![root, a, b, c]
    }

    #[tokio::test]
    async fn test_recalculate_all_builds_records() {
        let store = Arc::new(MemoryStore::default());
        let ids = seed_chain(&store).await;
        let service = service(&store);

        let summary = service.recalculate_all().await.unwrap();
        assert_eq!(summary.processed, 4);
        assert_eq!(summary.updated, 4);
        assert_eq!(summary.preserved_overrides, 0);

        let root = store.get_earning(&ids[0]).await.unwrap().unwrap();
        assert_eq!((root.level1_count, root.level2_count, root.level3_count), (1, 1, 1));
        assert_eq!(root.total_earnings, 2800 + 1100 + 700);
        assert_eq!(root.total_earnings, root.sum_levels());

        // 没有变化时第二次重算不计入updated
        let summary = service.recalculate_all().await.unwrap();
        assert_eq!(summary.updated, 0);
    }

    #[tokio::test]
    async fn test_recalculate_all_preserves_override() {
        let store = Arc::new(MemoryStore::default());
        let ids = seed_chain(&store).await;
        let service = service(&store);

        service
            .update_earning(
                &ids[0],
                ReferralEarningOverride {
                    level1_earnings: Some(50_000),
                    notes: Some("promo".into()),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        // 新增一个直接下级
        store.insert_user("d@example.com", Some(ids[0]), true).await;

        let summary = service.recalculate_all().await.unwrap();
        assert_eq!(summary.preserved_overrides, 1);

        let root = store.get_earning(&ids[0]).await.unwrap().unwrap();
        assert!(root.is_manually_edited);
        assert_eq!(root.level1_count, 2);
        assert_eq!(root.level1_earnings, 50_000);
        assert_eq!(root.level2_earnings, 1100);
        assert_eq!(root.total_earnings, 50_000 + 1100 + 700);
    }

    #[tokio::test]
    async fn test_reset_override_restores_computed_figures() {
        let store = Arc::new(MemoryStore::default());
        let ids = seed_chain(&store).await;
        let service = service(&store);

        let edited = service
            .update_earning(
                &ids[1],
                ReferralEarningOverride {
                    level1_earnings: Some(1),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert!(edited.is_manually_edited);
        assert_eq!(edited.total_earnings, 1 + 1100);

        let reset = service.reset_override(&ids[1]).await.unwrap();
        assert!(!reset.is_manually_edited);
        assert_eq!(reset.level1_earnings, 2800);
        assert_eq!(reset.total_earnings, 2800 + 1100);
    }

    #[tokio::test]
    async fn test_activation_credits_referrer_and_ancestors() {
        let store = Arc::new(MemoryStore::default());
        let ids = seed_chain(&store).await;
        let service = service(&store);
        service.recalculate_all().await.unwrap();

        // 新用户挂在c下面，激活后 c/b/a 分别是第1/2/3级，root 超过三级
        let new_user = store.insert_user("new@example.com", Some(ids[3]), true).await;
        let user = store.get_user(&new_user).await.unwrap().unwrap();

        service.on_user_activated(&user).await.unwrap();

        let c = store.get_user(&ids[3]).await.unwrap().unwrap();
        assert_eq!(c.earnings, 2800);
        let b = store.get_user(&ids[2]).await.unwrap().unwrap();
        assert_eq!(b.earnings, 0);

        let c_record = store.get_earning(&ids[3]).await.unwrap().unwrap();
        assert_eq!((c_record.level1_count, c_record.level1_earnings), (1, 2800));
        let b_record = store.get_earning(&ids[2]).await.unwrap().unwrap();
        assert_eq!((b_record.level1_count, b_record.level2_count), (1, 1));
        let a_record = store.get_earning(&ids[1]).await.unwrap().unwrap();
        assert_eq!(a_record.level3_count, 1);
        assert_eq!(a_record.level3_earnings, 700);
        let root_record = store.get_earning(&ids[0]).await.unwrap().unwrap();
        assert_eq!(root_record.level3_count, 1);

        // 增量结果与全量重算一致，只有新用户自己的空记录是新增的
        let summary = service.recalculate_all().await.unwrap();
        assert_eq!(summary.processed, 5);
        assert_eq!(summary.updated, 1);
        assert!(store.get_earning(&new_user).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_repeated_activation_is_not_counted_twice() {
        let store = Arc::new(MemoryStore::default());
        let ids = seed_chain(&store).await;
        let service = service(&store);
        service.recalculate_all().await.unwrap();

        let new_user = store.insert_user("new@example.com", Some(ids[3]), true).await;
        let user = store.get_user(&new_user).await.unwrap().unwrap();

        // 奖励已入账但收益记录写入失败，之后整体重放
        store.fail_next("increment_level");
        assert!(service.on_user_activated(&user).await.is_err());
        service.on_user_activated(&user).await.unwrap();
        service.on_user_activated(&user).await.unwrap();

        let c = store.get_user(&ids[3]).await.unwrap().unwrap();
        assert_eq!(c.earnings, 2800);

        let c_record = store.get_earning(&ids[3]).await.unwrap().unwrap();
        assert_eq!((c_record.level1_count, c_record.level1_earnings), (1, 2800));
        let b_record = store.get_earning(&ids[2]).await.unwrap().unwrap();
        assert_eq!((b_record.level1_count, b_record.level2_count), (1, 1));
        let a_record = store.get_earning(&ids[1]).await.unwrap().unwrap();
        assert_eq!((a_record.level2_count, a_record.level3_count), (1, 1));
    }

    #[tokio::test]
    async fn test_activation_counts_only_for_manual_records() {
        let store = Arc::new(MemoryStore::default());
        let root = store.insert_user("root@example.com", None, true).await;
        let service = service(&store);

        service
            .update_earning(
                &root,
                ReferralEarningOverride {
                    level1_earnings: Some(100),
                    ..Default::default()
                },
            )
            .await
            .unwrap();

        let child = store.insert_user("child@example.com", Some(root), true).await;
        let child = store.get_user(&child).await.unwrap().unwrap();
        service.on_user_activated(&child).await.unwrap();

        let record = store.get_earning(&root).await.unwrap().unwrap();
        assert_eq!(record.level1_count, 1);
        assert_eq!(record.level1_earnings, 100);
        assert_eq!(record.total_earnings, 100);

        // 余额仍然入账
        let root = store.get_user(&root).await.unwrap().unwrap();
        assert_eq!(root.earnings, 2800);
    }

    #[tokio::test]
    async fn test_activation_without_referrer_is_noop() {
        let store = Arc::new(MemoryStore::default());
        let id = store.insert_user("solo@example.com", None, true).await;
        let user = store.get_user(&id).await.unwrap().unwrap();

        service(&store).on_user_activated(&user).await.unwrap();
        assert!(store.list_earnings().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_get_or_calculate_and_listing() {
        let store = Arc::new(MemoryStore::default());
        let ids = seed_chain(&store).await;
        let service = service(&store);

        let record = service.get_or_calculate(&ids[1]).await.unwrap();
        assert_eq!(record.level1_count, 1);
        assert_eq!(record.level2_count, 1);

        let listed = service.list_earnings().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].1.as_ref().map(|u| u.email.as_str()), Some("a@example.com"));

        let missing = service.get_or_calculate(&ObjectId::new()).await.unwrap_err();
        assert!(matches!(missing, AppError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_inactive_users_do_not_earn_until_activated() {
        let store = Arc::new(MemoryStore::default());
        let root = store.insert_user("root@example.com", None, true).await;
        let pending = store.insert_user("p@example.com", Some(root), false).await;
        let service = service(&store);

        assert_eq!(service.recalculate_user(&root).await.unwrap().level1_count, 0);

        store
            .update_user(
                &pending,
                &UserUpdate {
                    is_active: Some(true),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(service.recalculate_user(&root).await.unwrap().level1_count, 1);

        service.remove_user(&root).await.unwrap();
        assert!(store.get_earning(&root).await.unwrap().is_none());
    }
}
