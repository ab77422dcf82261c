//! 多级推荐收益计算
//!
//! 推荐关系是一片以"无推荐人"用户为根的森林，但 `referredBy` 上没有任何约束阻止环的出现，
//! 所以所有遍历都带深度上限和访问集合。

use chrono::{DateTime, Utc};
use database::{referral_earning::model::ReferralEarning, user::model::ReferralNode};
use mongodb::bson::oid::ObjectId;
use std::collections::{HashMap, HashSet, VecDeque};
use utils::AppConfig;

/// 参与分成的最大层级
pub const MAX_REFERRAL_DEPTH: usize = 3;

/// 每一级的固定奖励
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LevelPayouts {
    pub level1: i64,
    pub level2: i64,
    pub level3: i64,
}

impl LevelPayouts {
    pub fn for_level(&self, level: usize) -> i64 {
        match level {
            1 => self.level1,
            2 => self.level2,
            3 => self.level3,
            _ => 0,
        }
    }
}

impl Default for LevelPayouts {
    fn default() -> Self {
        Self {
            level1: 2800,
            level2: 1100,
            level3: 700,
        }
    }
}

impl From<&AppConfig> for LevelPayouts {
    fn from(config: &AppConfig) -> Self {
        Self {
            level1: config.referral_level1_bonus,
            level2: config.referral_level2_bonus,
            level3: config.referral_level3_bonus,
        }
    }
}

/// 某个用户各层级的人数与收益
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelBreakdown {
    pub level1_count: u64,
    pub level2_count: u64,
    pub level3_count: u64,
    pub level1_earnings: i64,
    pub level2_earnings: i64,
    pub level3_earnings: i64,
}

impl LevelBreakdown {
    fn credit(&mut self, level: usize, amount: i64) {
        match level {
            1 => {
                self.level1_count += 1;
                self.level1_earnings += amount;
            }
            2 => {
                self.level2_count += 1;
                self.level2_earnings += amount;
            }
            3 => {
                self.level3_count += 1;
                self.level3_earnings += amount;
            }
            _ => {}
        }
    }

    pub fn total_earnings(&self) -> i64 {
        self.level1_earnings + self.level2_earnings + self.level3_earnings
    }

    pub fn total_count(&self) -> u64 {
        self.level1_count + self.level2_count + self.level3_count
    }
}

#[derive(Debug, Clone, Copy)]
struct NodeState {
    referred_by: Option<ObjectId>,
    is_active: bool,
}

/// 内存中的推荐关系图
#[derive(Debug, Clone, Default)]
pub struct ReferralGraph {
    nodes: HashMap<ObjectId, NodeState>,
    children: HashMap<ObjectId, Vec<ObjectId>>,
}

impl ReferralGraph {
    pub fn from_nodes(nodes: impl IntoIterator<Item = ReferralNode>) -> Self {
        let mut graph = ReferralGraph::default();

        for node in nodes {
            // 自己推荐自己视为没有推荐人
            let referred_by = node.referred_by.filter(|upper| upper != &node.id);
            if let Some(upper) = referred_by {
                graph.children.entry(upper).or_default().push(node.id);
            }
            graph.nodes.insert(
                node.id,
                NodeState {
                    referred_by,
                    is_active: node.is_active,
                },
            );
        }

        graph
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn contains(&self, user: &ObjectId) -> bool {
        self.nodes.contains_key(user)
    }

    pub fn users(&self) -> impl Iterator<Item = &ObjectId> {
        self.nodes.keys()
    }

    pub fn is_active(&self, user: &ObjectId) -> bool {
        self.nodes.get(user).map(|n| n.is_active).unwrap_or(false)
    }

    /// 向上查找推荐链：[上级, 上上级, ...]，到根、到深度上限或遇到重复节点时停止
    ///
    /// 已被删除的推荐人（图中不存在的id）仍然作为链上的一环返回，但不会继续向上。
    pub fn ancestors(&self, user: &ObjectId, max_depth: usize) -> Vec<ObjectId> {
        let mut chain = Vec::with_capacity(max_depth);
        let mut visited = HashSet::from([*user]);
        let mut current = *user;

        while chain.len() < max_depth {
            let Some(upper) = self.nodes.get(&current).and_then(|n| n.referred_by) else {
                break;
            };
            if !visited.insert(upper) {
                break;
            }
            chain.push(upper);
            current = upper;
        }

        chain
    }

    /// 全量计算：每个已激活用户向其前三级上级各贡献一次对应层级的奖励
    pub fn compute_all(&self, payouts: &LevelPayouts) -> HashMap<ObjectId, LevelBreakdown> {
        let mut breakdowns: HashMap<ObjectId, LevelBreakdown> =
            self.nodes.keys().map(|id| (*id, LevelBreakdown::default())).collect();

        for (id, node) in &self.nodes {
            if !node.is_active {
                continue;
            }
            for (depth, ancestor) in self.ancestors(id, MAX_REFERRAL_DEPTH).into_iter().enumerate() {
                let level = depth + 1;
                if let Some(breakdown) = breakdowns.get_mut(&ancestor) {
                    breakdown.credit(level, payouts.for_level(level));
                }
            }
        }

        breakdowns
    }

    /// 单个用户：以该用户为根向下广度遍历三层
    pub fn compute_for(&self, user: &ObjectId, payouts: &LevelPayouts) -> LevelBreakdown {
        let mut breakdown = LevelBreakdown::default();
        let mut visited = HashSet::from([*user]);
        let mut queue = VecDeque::from([(*user, 0usize)]);

        while let Some((current, depth)) = queue.pop_front() {
            if depth == MAX_REFERRAL_DEPTH {
                continue;
            }
            let Some(children) = self.children.get(&current) else {
                continue;
            };
            for child in children {
                if !visited.insert(*child) {
                    continue;
                }
                let level = depth + 1;
                if self.is_active(child) {
                    breakdown.credit(level, payouts.for_level(level));
                }
                queue.push_back((*child, level));
            }
        }

        breakdown
    }
}

/// 重算结果与已有记录的合并
#[derive(Debug, Clone, PartialEq)]
pub struct Reconciled {
    pub record: ReferralEarning,
    /// 是否保留了管理员手动修改的收益
    pub preserved_override: bool,
    /// 与原记录相比是否有变化
    pub changed: bool,
}

/// 合并重算结果：手动修改过的记录只刷新人数，收益保持不变
pub fn reconcile(
    user: ObjectId,
    existing: Option<&ReferralEarning>,
    computed: &LevelBreakdown,
    now: DateTime<Utc>,
) -> Reconciled {
    let mut record = existing.cloned().unwrap_or_else(|| ReferralEarning::empty(user));
    let before = existing.cloned();

    record.level1_count = computed.level1_count;
    record.level2_count = computed.level2_count;
    record.level3_count = computed.level3_count;

    let preserved_override = record.is_manually_edited;
    if !preserved_override {
        record.level1_earnings = computed.level1_earnings;
        record.level2_earnings = computed.level2_earnings;
        record.level3_earnings = computed.level3_earnings;
        record.total_earnings = computed.total_earnings();
    }

    let changed = match &before {
        Some(before) => !same_figures(before, &record),
        None => true,
    };

    record.last_calculated_at = now;
    if changed {
        record.updated_at = now;
    }

    Reconciled {
        record,
        preserved_override,
        changed,
    }
}

fn same_figures(a: &ReferralEarning, b: &ReferralEarning) -> bool {
    a.level1_count == b.level1_count
        && a.level2_count == b.level2_count
        && a.level3_count == b.level3_count
        && a.level1_earnings == b.level1_earnings
        && a.level2_earnings == b.level2_earnings
        && a.level3_earnings == b.level3_earnings
        && a.total_earnings == b.total_earnings
}
