//! 能力表與兵種表
//!
//! 啟動時載入一次，之後只讀。

use crate::alias::{AbilityId, PlayerId, UnitId};
use crate::constants::{MAX_ABILITIES_PER_UNIT_TYPE, ONE_TIME_COOLDOWN};
use crate::core_types::{Position, TurnModifiers, Unit, UnitType};
use crate::error::{CatalogError, Context, Error, Result};
use crate::loader::{parse_abilities, parse_units};
use crate::loader_schema::{Ability, AbilityEffect, UnitStats};
use std::collections::BTreeMap;
use strum::IntoEnumIterator;

const BUILTIN_ABILITIES_TOML: &str = include_str!("../data/abilities.toml");
const BUILTIN_UNITS_TOML: &str = include_str!("../data/units.toml");

#[derive(Debug, Clone, Default)]
pub struct Catalog {
    abilities: BTreeMap<AbilityId, Ability>,
    unit_types: BTreeMap<UnitType, UnitStats>,
}

impl Catalog {
    /// 建立並驗證能力表
    ///
    /// - 能力 ID 不可重複，冷卻不可小於 -1，效果數值必須為正
    /// - 每個兵種都必須定義，最多 `MAX_ABILITIES_PER_UNIT_TYPE` 個能力，且能力必須存在
    /// - 兵種 HP 與行動數必須為正，攻擊力不可為負
    pub fn new(abilities: Vec<Ability>, units: Vec<UnitStats>) -> Result<Self> {
        let mut ability_map = BTreeMap::new();
        for ability in abilities {
            if ability.cooldown < ONE_TIME_COOLDOWN {
                return Err(CatalogError::InvalidAbility {
                    ability_id: ability.id,
                    reason: format!("冷卻 {} 小於 -1", ability.cooldown),
                }
                .into());
            }
            if let Some(reason) = invalid_effect(&ability.effect) {
                return Err(CatalogError::InvalidAbility {
                    ability_id: ability.id,
                    reason,
                }
                .into());
            }
            if ability_map.contains_key(&ability.id) {
                return Err(CatalogError::DuplicateAbility {
                    ability_id: ability.id,
                }
                .into());
            }
            ability_map.insert(ability.id.clone(), ability);
        }

        let mut unit_map = BTreeMap::new();
        for stats in units {
            if let Some(reason) = invalid_stats(&stats) {
                return Err(CatalogError::InvalidUnitStats {
                    unit_type: stats.unit_type,
                    reason,
                }
                .into());
            }
            if stats.abilities.len() > MAX_ABILITIES_PER_UNIT_TYPE {
                return Err(CatalogError::TooManyAbilities {
                    unit_type: stats.unit_type,
                    count: stats.abilities.len(),
                }
                .into());
            }
            if let Some(missing) = stats
                .abilities
                .iter()
                .find(|id| !ability_map.contains_key(*id))
            {
                let err: Error = CatalogError::AbilityNotFound {
                    ability_id: missing.clone(),
                }
                .into();
                return Err(err.context(format!("兵種 {} 的能力", stats.unit_type)));
            }
            unit_map.insert(stats.unit_type, stats);
        }
        if let Some(unit_type) = UnitType::iter().find(|t| !unit_map.contains_key(t)) {
            return Err(CatalogError::UnitTypeMissing { unit_type }.into());
        }

        Ok(Self {
            abilities: ability_map,
            unit_types: unit_map,
        })
    }

    /// 由 TOML 文字建立
    pub fn from_toml(abilities_toml: &str, units_toml: &str) -> Result<Self> {
        let abilities = parse_abilities(abilities_toml)?;
        let units = parse_units(units_toml)?;
        Self::new(abilities.abilities, units.units)
    }

    /// 內建能力表
    pub fn builtin() -> Result<Self> {
        Self::from_toml(BUILTIN_ABILITIES_TOML, BUILTIN_UNITS_TOML).context("載入內建能力表")
    }

    pub fn get_ability(&self, ability_id: &str) -> Option<&Ability> {
        self.abilities.get(ability_id)
    }

    /// 兵種的能力（依定義順序）
    pub fn get_unit_abilities(&self, unit_type: UnitType) -> Vec<&Ability> {
        self.unit_types
            .get(&unit_type)
            .map(|stats| {
                stats
                    .abilities
                    .iter()
                    .filter_map(|id| self.abilities.get(id))
                    .collect()
            })
            .unwrap_or_default()
    }

    pub fn unit_stats(&self, unit_type: UnitType) -> Option<&UnitStats> {
        self.unit_types.get(&unit_type)
    }

    pub fn unit_types(&self) -> impl Iterator<Item = &UnitStats> + '_ {
        self.unit_types.values()
    }

    /// 依兵種建立新單位，所有能力冷卻為 0
    pub fn spawn_unit(
        &self,
        unit_type: UnitType,
        id: UnitId,
        owner: PlayerId,
        position: Position,
    ) -> Result<Unit> {
        let stats = self
            .unit_types
            .get(&unit_type)
            .ok_or(CatalogError::UnitTypeMissing { unit_type })?;
        Ok(Unit {
            id,
            owner,
            unit_type,
            position,
            hp: stats.hp,
            max_hp: stats.hp,
            move_range: stats.move_range,
            attack_range: stats.attack_range,
            attack_damage: stats.attack_damage,
            actions_remaining: 0,
            max_actions: stats.max_actions,
            status_effects: vec![],
            cost: stats.cost,
            has_moved: false,
            has_attacked: false,
            abilities: stats.abilities.clone(),
            cooldowns: stats.abilities.iter().map(|id| (id.clone(), 0)).collect(),
            modifiers: TurnModifiers::default(),
        })
    }
}

fn invalid_stats(stats: &UnitStats) -> Option<String> {
    if stats.hp <= 0 {
        Some(format!("HP {} 必須大於 0", stats.hp))
    } else if stats.attack_damage < 0 {
        Some(format!("攻擊力 {} 不可為負", stats.attack_damage))
    } else if stats.max_actions == 0 {
        Some("行動數必須大於 0".to_string())
    } else {
        None
    }
}

fn invalid_effect(effect: &AbilityEffect) -> Option<String> {
    match *effect {
        AbilityEffect::Damage { amount }
        | AbilityEffect::Heal { amount }
        | AbilityEffect::DamageAndStatus { amount, .. }
            if amount <= 0 =>
        {
            Some(format!("效果數值 {amount} 必須大於 0"))
        }
        AbilityEffect::Execute { max_target_hp } if max_target_hp <= 0 => {
            Some(format!("HP 門檻 {max_target_hp} 必須大於 0"))
        }
        AbilityEffect::GrantActions { amount: 0 } | AbilityEffect::RaiseBudget { amount: 0 } => {
            Some("效果數值必須大於 0".to_string())
        }
        AbilityEffect::ApplyStatus { duration: 0, .. }
        | AbilityEffect::DamageAndStatus { duration: 0, .. } => {
            Some("狀態持續時間必須大於 0".to_string())
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_types::StatusKind;
    use crate::error::ErrorKind;
    use crate::loader_schema::TargetType;

    fn ability(id: &str, cooldown: i32) -> Ability {
        Ability {
            id: id.to_string(),
            name: id.to_string(),
            description: String::new(),
            cost: 1,
            cooldown,
            range: 1,
            target: TargetType::Enemy,
            effect: AbilityEffect::Damage { amount: 1 },
        }
    }

    fn stats(unit_type: UnitType, abilities: &[&str]) -> UnitStats {
        UnitStats {
            unit_type,
            hp: 3,
            move_range: 2,
            attack_range: 1,
            attack_damage: 1,
            max_actions: 2,
            cost: 2,
            abilities: abilities.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn all_stats() -> Vec<UnitStats> {
        UnitType::iter().map(|t| stats(t, &[])).collect()
    }

    #[test]
    fn test_builtin_catalog() {
        let catalog = Catalog::builtin().unwrap();
        for unit_type in UnitType::iter() {
            let stats = catalog.unit_stats(unit_type).unwrap();
            let abilities = catalog.get_unit_abilities(unit_type);
            assert_eq!(abilities.len(), stats.abilities.len(), "{unit_type}");
            assert!(abilities.len() <= MAX_ABILITIES_PER_UNIT_TYPE);
        }
        let layoff = catalog.get_ability("layoff").unwrap();
        assert_eq!(layoff.cost, 2);
        assert_eq!(layoff.cooldown, ONE_TIME_COOLDOWN);
        assert_eq!(layoff.effect, AbilityEffect::Execute { max_target_hp: 2 });
        assert!(catalog.get_ability("nonexistent").is_none());
    }

    #[test]
    fn test_get_unit_abilities_order() {
        let catalog = Catalog::builtin().unwrap();
        let ids: Vec<&str> = catalog
            .get_unit_abilities(UnitType::Executive)
            .iter()
            .map(|a| a.id.as_str())
            .collect();
        assert_eq!(ids, vec!["layoff", "golden_parachute"]);
    }

    #[test]
    fn test_catalog_validation() {
        let err = Catalog::new(vec![ability("x", 1), ability("x", 2)], all_stats()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Catalog(CatalogError::DuplicateAbility { .. })
        ));

        let err = Catalog::new(vec![ability("x", -2)], all_stats()).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Catalog(CatalogError::InvalidAbility { .. })
        ));

        let mut units = all_stats();
        units[0] = stats(units[0].unit_type, &["x", "missing"]);
        let err = Catalog::new(vec![ability("x", 1)], units).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Catalog(CatalogError::AbilityNotFound { .. })
        ));

        let mut units = all_stats();
        units[0] = stats(units[0].unit_type, &["x", "y", "z"]);
        let err = Catalog::new(
            vec![ability("x", 1), ability("y", 1), ability("z", 1)],
            units,
        )
        .unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Catalog(CatalogError::TooManyAbilities { count: 3, .. })
        ));

        let mut units = all_stats();
        units.retain(|s| s.unit_type != UnitType::Manager);
        let err = Catalog::new(vec![], units).unwrap_err();
        assert!(matches!(
            err.kind(),
            ErrorKind::Catalog(CatalogError::UnitTypeMissing {
                unit_type: UnitType::Manager
            })
        ));
    }

    #[test]
    fn test_catalog_rejects_invalid_unit_stats() {
        type Patch = fn(&mut UnitStats);
        let test_data: [(Patch, &str); 4] = [
            (|s: &mut UnitStats| s.hp = 0, "HP 0"),
            (|s: &mut UnitStats| s.hp = -2, "HP -2"),
            (|s: &mut UnitStats| s.attack_damage = -3, "攻擊力 -3"),
            (|s: &mut UnitStats| s.max_actions = 0, "行動數"),
        ];
        for (patch, expected) in test_data {
            let mut units = all_stats();
            patch(&mut units[1]);
            let err = Catalog::new(vec![], units).unwrap_err();
            assert!(
                matches!(
                    err.kind(),
                    ErrorKind::Catalog(CatalogError::InvalidUnitStats { .. })
                ),
                "{err}"
            );
            assert!(err.to_string().contains(expected), "{err}");
        }

        // 攻擊力 0 合法
        let mut units = all_stats();
        units[0].attack_damage = 0;
        assert!(Catalog::new(vec![], units).is_ok());
    }

    #[test]
    fn test_catalog_rejects_invalid_effects() {
        let test_data = [
            AbilityEffect::Damage { amount: -1 },
            AbilityEffect::Damage { amount: 0 },
            AbilityEffect::Heal { amount: -2 },
            AbilityEffect::DamageAndStatus {
                amount: -1,
                status: StatusKind::Exhausted,
                duration: 1,
            },
            AbilityEffect::DamageAndStatus {
                amount: 1,
                status: StatusKind::Exhausted,
                duration: 0,
            },
            AbilityEffect::ApplyStatus {
                status: StatusKind::Harassed,
                duration: 0,
            },
            AbilityEffect::Execute { max_target_hp: 0 },
            AbilityEffect::GrantActions { amount: 0 },
            AbilityEffect::RaiseBudget { amount: 0 },
        ];
        for effect in test_data {
            let mut bad = ability("bad", 1);
            bad.effect = effect.clone();
            let err = Catalog::new(vec![bad], all_stats()).unwrap_err();
            assert!(
                matches!(
                    err.kind(),
                    ErrorKind::Catalog(CatalogError::InvalidAbility { .. })
                ),
                "{effect:?}"
            );
        }
    }

    #[test]
    fn test_spawn_unit() {
        let catalog = Catalog::builtin().unwrap();
        let unit = catalog
            .spawn_unit(UnitType::Developer, 7, 1, Position::new(2, 3))
            .unwrap();
        assert_eq!(unit.id, 7);
        assert_eq!(unit.hp, unit.max_hp);
        assert_eq!(unit.position, Position::new(2, 3));
        assert_eq!(unit.cooldown("hotfix"), 0);
        assert_eq!(unit.cooldowns.len(), unit.abilities.len());
        assert!(!unit.has_moved && !unit.has_attacked);
    }
}
