use std::fmt;

/// Tracked statistic types.
///
/// The numeric id returned by [`CounterKind::id`] is the only thing written to
/// storage. Variant names may change between releases; ids may not. New kinds
/// get a fresh id appended after the current maximum, and ids of removed kinds
/// go into [`RETIRED_IDS`] so they are never handed out again.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum CounterKind {
    FishCaught,
    LilyPadCaught,
    Jumped,
    IdleKicks,
    Trades,
    BucketUsed,
    NetherPortalUsed,
    EndPortalUsed,
    EnderPearlUsed,
    AirPunches,
    BedUsed,
    EggsThrown,
    ChickensHatched,
    TotalItemDamage,
    FoodConsumed,
    PotionsConsumed,
    MilkConsumed,
    Sneaked,
    Flights,
    Sprints,
    AdvancementsDone,
    EndermanAttacks,
    TotalExperienceGained,
    PotatoesHarvested,
    FishHookInGround,
    FishingFailed,
    FishHookInPlayer,
}

/// Ids that belonged to kinds which no longer exist.
pub const RETIRED_IDS: &[u16] = &[];

impl CounterKind {
    pub const ALL: [CounterKind; 27] = [
        CounterKind::FishCaught,
        CounterKind::LilyPadCaught,
        CounterKind::Jumped,
        CounterKind::IdleKicks,
        CounterKind::Trades,
        CounterKind::BucketUsed,
        CounterKind::NetherPortalUsed,
        CounterKind::EndPortalUsed,
        CounterKind::EnderPearlUsed,
        CounterKind::AirPunches,
        CounterKind::BedUsed,
        CounterKind::EggsThrown,
        CounterKind::ChickensHatched,
        CounterKind::TotalItemDamage,
        CounterKind::FoodConsumed,
        CounterKind::PotionsConsumed,
        CounterKind::MilkConsumed,
        CounterKind::Sneaked,
        CounterKind::Flights,
        CounterKind::Sprints,
        CounterKind::AdvancementsDone,
        CounterKind::EndermanAttacks,
        CounterKind::TotalExperienceGained,
        CounterKind::PotatoesHarvested,
        CounterKind::FishHookInGround,
        CounterKind::FishingFailed,
        CounterKind::FishHookInPlayer,
    ];

    /// Stable storage id.
    pub const fn id(self) -> u16 {
        match self {
            CounterKind::FishCaught => 1,
            CounterKind::LilyPadCaught => 2,
            CounterKind::Jumped => 3,
            CounterKind::IdleKicks => 4,
            CounterKind::Trades => 5,
            CounterKind::BucketUsed => 6,
            CounterKind::NetherPortalUsed => 7,
            CounterKind::EndPortalUsed => 8,
            CounterKind::EnderPearlUsed => 9,
            CounterKind::AirPunches => 10,
            CounterKind::BedUsed => 11,
            CounterKind::EggsThrown => 12,
            CounterKind::ChickensHatched => 13,
            CounterKind::TotalItemDamage => 14,
            CounterKind::FoodConsumed => 15,
            CounterKind::PotionsConsumed => 16,
            CounterKind::MilkConsumed => 17,
            CounterKind::Sneaked => 18,
            CounterKind::Flights => 19,
            CounterKind::Sprints => 20,
            CounterKind::AdvancementsDone => 21,
            CounterKind::EndermanAttacks => 22,
            CounterKind::TotalExperienceGained => 23,
            CounterKind::PotatoesHarvested => 24,
            CounterKind::FishHookInGround => 25,
            CounterKind::FishingFailed => 26,
            CounterKind::FishHookInPlayer => 27,
        }
    }

    /// Reverse lookup of [`CounterKind::id`]. Unknown and retired ids yield `None`.
    pub fn from_id(id: u16) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.id() == id)
    }

    /// Label used in logs.
    pub const fn name(self) -> &'static str {
        match self {
            CounterKind::FishCaught => "fish_caught",
            CounterKind::LilyPadCaught => "lily_pad_caught",
            CounterKind::Jumped => "jumped",
            CounterKind::IdleKicks => "idle_kicks",
            CounterKind::Trades => "trades",
            CounterKind::BucketUsed => "bucket_used",
            CounterKind::NetherPortalUsed => "nether_portal_used",
            CounterKind::EndPortalUsed => "end_portal_used",
            CounterKind::EnderPearlUsed => "ender_pearl_used",
            CounterKind::AirPunches => "air_punches",
            CounterKind::BedUsed => "bed_used",
            CounterKind::EggsThrown => "eggs_thrown",
            CounterKind::ChickensHatched => "chickens_hatched",
            CounterKind::TotalItemDamage => "total_item_damage",
            CounterKind::FoodConsumed => "food_consumed",
            CounterKind::PotionsConsumed => "potions_consumed",
            CounterKind::MilkConsumed => "milk_consumed",
            CounterKind::Sneaked => "sneaked",
            CounterKind::Flights => "flights",
            CounterKind::Sprints => "sprints",
            CounterKind::AdvancementsDone => "advancements_done",
            CounterKind::EndermanAttacks => "enderman_attacks",
            CounterKind::TotalExperienceGained => "total_experience_gained",
            CounterKind::PotatoesHarvested => "potatoes_harvested",
            CounterKind::FishHookInGround => "fish_hook_in_ground",
            CounterKind::FishingFailed => "fishing_failed",
            CounterKind::FishHookInPlayer => "fish_hook_in_player",
        }
    }
}

impl fmt::Display for CounterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name(), self.id())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn ids_are_unique_and_not_retired() {
        let mut seen = HashSet::new();
        for k in CounterKind::ALL {
            assert!(seen.insert(k.id()), "duplicate id {}", k.id());
            assert!(!RETIRED_IDS.contains(&k.id()), "{k} reuses a retired id");
        }
    }

    #[test]
    fn from_id_inverts_id() {
        for k in CounterKind::ALL {
            assert_eq!(CounterKind::from_id(k.id()), Some(k));
        }
        assert_eq!(CounterKind::from_id(0), None);
        assert_eq!(CounterKind::from_id(28), None);
    }

    #[test]
    fn persisted_ids_are_pinned() {
        // Rows already on disk depend on these values.
        assert_eq!(CounterKind::FishCaught.id(), 1);
        assert_eq!(CounterKind::Jumped.id(), 3);
        assert_eq!(CounterKind::TotalItemDamage.id(), 14);
        assert_eq!(CounterKind::TotalExperienceGained.id(), 23);
        assert_eq!(CounterKind::FishHookInPlayer.id(), 27);
    }

    #[test]
    fn display_includes_name_and_id() {
        assert_eq!(CounterKind::Sprints.to_string(), "sprints(20)");
    }
}
