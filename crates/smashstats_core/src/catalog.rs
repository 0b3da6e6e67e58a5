//! Static lookup tables for action states, characters and stages.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttackAction {
    pub id: u16,
    pub name: &'static str,
    pub nice_name: &'static str,
}

const fn attack(id: u16, name: &'static str, nice_name: &'static str) -> AttackAction {
    AttackAction {
        id,
        name,
        nice_name,
    }
}

/// Attack action states that carry an L-cancel flag. Sorted by id.
pub static ATTACK_ACTIONS: [AttackAction; 33] = [
    attack(44, "Attack11", "Jab 1"),
    attack(45, "Attack12", "Jab 2"),
    attack(46, "Attack13", "Jab 3"),
    attack(47, "Attack100Start", "Rapid jab"),
    attack(48, "Attack100Loop", "Rapid jab"),
    attack(49, "Attack100End", "Rapid jab"),
    attack(50, "AttackDash", "Dash attack"),
    attack(51, "AttackS3Hi", "Forward tilt"),
    attack(52, "AttackS3HiS", "Forward tilt"),
    attack(53, "AttackS3S", "Forward tilt"),
    attack(54, "AttackS3LwS", "Forward tilt"),
    attack(55, "AttackS3Lw", "Forward tilt"),
    attack(56, "AttackHi3", "Up tilt"),
    attack(57, "AttackLw3", "Down tilt"),
    attack(58, "AttackS4Hi", "Forward smash"),
    attack(59, "AttackS4HiS", "Forward smash"),
    attack(60, "AttackS4S", "Forward smash"),
    attack(61, "AttackS4LwS", "Forward smash"),
    attack(62, "AttackS4Lw", "Forward smash"),
    attack(63, "AttackHi4", "Up smash"),
    attack(64, "AttackLw4", "Down smash"),
    attack(65, "AttackAirN", "Neutral air"),
    attack(66, "AttackAirF", "Forward air"),
    attack(67, "AttackAirB", "Back air"),
    attack(68, "AttackAirHi", "Up air"),
    attack(69, "AttackAirLw", "Down air"),
    attack(70, "LandingAirN", "Nair landing"),
    attack(71, "LandingAirF", "Fair landing"),
    attack(72, "LandingAirB", "Bair landing"),
    attack(73, "LandingAirHi", "Uair landing"),
    attack(74, "LandingAirLw", "Dair landing"),
    attack(212, "Catch", "Grab"),
    attack(214, "CatchDash", "Dash grab"),
];

pub fn attack_action(action_state_id: u16) -> Option<&'static AttackAction> {
    ATTACK_ACTIONS
        .binary_search_by_key(&action_state_id, |action| action.id)
        .ok()
        .map(|index| &ATTACK_ACTIONS[index])
}

pub const UNKNOWN: &str = "Unknown";

struct Character {
    name: &'static str,
    colors: &'static [&'static str],
}

// Indexed by external character id.
static CHARACTERS: [Character; 26] = [
    Character {
        name: "Captain Falcon",
        colors: &["Default", "Black", "Red", "White", "Green", "Blue"],
    },
    Character {
        name: "Donkey Kong",
        colors: &["Default", "Black", "Red", "Blue", "Green"],
    },
    Character {
        name: "Fox",
        colors: &["Default", "Red", "Blue", "Green"],
    },
    Character {
        name: "Mr. Game & Watch",
        colors: &["Default", "Red", "Blue", "Green"],
    },
    Character {
        name: "Kirby",
        colors: &["Default", "Yellow", "Blue", "Red", "Green", "White"],
    },
    Character {
        name: "Bowser",
        colors: &["Default", "Red", "Blue", "Black"],
    },
    Character {
        name: "Link",
        colors: &["Default", "Red", "Blue", "Black", "White"],
    },
    Character {
        name: "Luigi",
        colors: &["Default", "White", "Blue", "Red"],
    },
    Character {
        name: "Mario",
        colors: &["Default", "Yellow", "Black", "Blue", "Green"],
    },
    Character {
        name: "Marth",
        colors: &["Default", "Red", "Green", "Black", "White"],
    },
    Character {
        name: "Mewtwo",
        colors: &["Default", "Red", "Blue", "Green"],
    },
    Character {
        name: "Ness",
        colors: &["Default", "Yellow", "Blue", "Green"],
    },
    Character {
        name: "Peach",
        colors: &["Default", "Daisy", "White", "Blue", "Green"],
    },
    Character {
        name: "Pikachu",
        colors: &["Default", "Red", "Party Hat", "Cowboy Hat"],
    },
    Character {
        name: "Ice Climbers",
        colors: &["Default", "Green", "Orange", "Red"],
    },
    Character {
        name: "Jigglypuff",
        colors: &["Default", "Red", "Blue", "Headband", "Crown"],
    },
    Character {
        name: "Samus",
        colors: &["Default", "Pink", "Black", "Green", "Purple"],
    },
    Character {
        name: "Yoshi",
        colors: &["Default", "Red", "Blue", "Yellow", "Pink", "Cyan"],
    },
    Character {
        name: "Zelda",
        colors: &["Default", "Red", "Blue", "Green", "White"],
    },
    Character {
        name: "Sheik",
        colors: &["Default", "Red", "Blue", "Green", "White"],
    },
    Character {
        name: "Falco",
        colors: &["Default", "Red", "Blue", "Green"],
    },
    Character {
        name: "Young Link",
        colors: &["Default", "Red", "Blue", "White", "Black"],
    },
    Character {
        name: "Dr. Mario",
        colors: &["Default", "Red", "Blue", "Green", "Black"],
    },
    Character {
        name: "Roy",
        colors: &["Default", "Red", "Blue", "Green", "Yellow"],
    },
    Character {
        name: "Pichu",
        colors: &["Default", "Red", "Blue", "Green"],
    },
    Character {
        name: "Ganondorf",
        colors: &["Default", "Red", "Blue", "Green", "Purple"],
    },
];

pub fn character_name(character_id: u8) -> &'static str {
    CHARACTERS
        .get(usize::from(character_id))
        .map_or(UNKNOWN, |character| character.name)
}

pub fn character_color_name(character_id: u8, color: u8) -> &'static str {
    CHARACTERS
        .get(usize::from(character_id))
        .and_then(|character| character.colors.get(usize::from(color)))
        .copied()
        .unwrap_or(UNKNOWN)
}

pub fn stage_name(stage_id: u16) -> &'static str {
    match stage_id {
        2 => "Fountain of Dreams",
        3 => "Pokémon Stadium",
        4 => "Princess Peach's Castle",
        5 => "Kongo Jungle",
        6 => "Brinstar",
        7 => "Corneria",
        8 => "Yoshi's Story",
        9 => "Onett",
        10 => "Mute City",
        11 => "Rainbow Cruise",
        12 => "Jungle Japes",
        13 => "Great Bay",
        14 => "Hyrule Temple",
        15 => "Brinstar Depths",
        16 => "Yoshi's Island",
        17 => "Green Greens",
        18 => "Fourside",
        19 => "Mushroom Kingdom I",
        20 => "Mushroom Kingdom II",
        22 => "Venom",
        23 => "Poké Floats",
        24 => "Big Blue",
        25 => "Icicle Mountain",
        26 => "Icetop",
        27 => "Flat Zone",
        28 => "Dream Land N64",
        29 => "Yoshi's Island N64",
        30 => "Kongo Jungle N64",
        31 => "Battlefield",
        32 => "Final Destination",
        _ => UNKNOWN,
    }
}
