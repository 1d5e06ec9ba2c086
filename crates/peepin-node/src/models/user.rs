//! User profile model.

use peepin_proximity::SharingProfile;
use serde::{Deserialize, Serialize};

/// Which audience a profile is tuned for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    #[default]
    Pro,
    Social,
    Private,
}

/// A user's public profile.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    /// Unique identifier
    pub id: String,

    /// Display name
    pub name: String,

    /// Unique handle used to log in
    pub handle: String,

    /// Headline
    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub bio: String,

    #[serde(default)]
    pub mode: Mode,

    /// Avatar image URL
    #[serde(default)]
    pub avatar: String,

    /// Free-text home location ("Seattle"), unrelated to live position
    #[serde(default)]
    pub location: String,

    /// Whether live position may be shown to others
    #[serde(default)]
    pub share_location: bool,
}

impl UserProfile {
    /// Create a profile with required fields. Sharing starts off.
    pub fn new(id: String, handle: String, name: String) -> Self {
        Self {
            id,
            name,
            handle,
            title: String::new(),
            bio: String::new(),
            mode: Mode::Pro,
            avatar: String::new(),
            location: String::new(),
            share_location: false,
        }
    }

    /// Demo profiles seeded into an empty node.
    ///
    /// These share their location by default so a fresh node has someone to
    /// find.
    pub fn demo_users() -> Vec<Self> {
        DEMO_SEEDS
            .iter()
            .map(|seed| Self {
                id: seed.id.to_string(),
                name: seed.name.to_string(),
                handle: seed.handle.to_string(),
                title: seed.title.to_string(),
                bio: seed.bio.to_string(),
                mode: seed.mode,
                avatar: format!("https://i.pravatar.cc/150?img={}", seed.avatar),
                location: seed.location.to_string(),
                share_location: true,
            })
            .collect()
    }
}

struct DemoSeed {
    id: &'static str,
    name: &'static str,
    handle: &'static str,
    title: &'static str,
    bio: &'static str,
    mode: Mode,
    avatar: u8,
    location: &'static str,
}

const DEMO_SEEDS: [DemoSeed; 5] = [
    DemoSeed {
        id: "user_1",
        name: "Avery Chen",
        handle: "avery.chen",
        title: "Product Lead at Flowline",
        bio: "Building calm social spaces for real life.",
        mode: Mode::Pro,
        avatar: 32,
        location: "Seattle",
    },
    DemoSeed {
        id: "user_2",
        name: "Mila Ortiz",
        handle: "mila.ortiz",
        title: "Creative Director",
        bio: "Color, motion, and a little mischief.",
        mode: Mode::Social,
        avatar: 45,
        location: "Miami",
    },
    DemoSeed {
        id: "user_3",
        name: "Rohan Patel",
        handle: "rohan.patel",
        title: "Backend Engineer",
        bio: "Shipping clean APIs and clean interiors.",
        mode: Mode::Pro,
        avatar: 12,
        location: "Austin",
    },
    DemoSeed {
        id: "user_4",
        name: "Skylar Nguyen",
        handle: "sky.nguyen",
        title: "Photographer",
        bio: "Daily light studies and long walks.",
        mode: Mode::Social,
        avatar: 5,
        location: "Portland",
    },
    DemoSeed {
        id: "user_5",
        name: "Lena Park",
        handle: "lena.park",
        title: "Close Friends Only",
        bio: "Small circle, big energy.",
        mode: Mode::Private,
        avatar: 21,
        location: "Brooklyn",
    },
];

impl SharingProfile for UserProfile {
    fn shares_location(&self) -> bool {
        self.share_location
    }
}
