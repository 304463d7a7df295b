//! Static mapping from normalized genre keys to umbrella categories.
//!
//! Keys must already be in [`normalize`](super::normalize) form; the tests
//! below enforce it.

use once_cell::sync::Lazy;
use std::collections::HashMap;

/// Every umbrella category, in display order
pub const UMBRELLA_GENRES: &[&str] = &[
    "Electronic",
    "Ambient",
    "Rock",
    "Metal",
    "Punk",
    "Hip-Hop",
    "Pop",
    "R&B/Soul",
    "Funk",
    "Jazz",
    "Blues",
    "Classical",
    "Country",
    "Folk",
    "Reggae",
    "Latin",
    "World",
    "Soundtrack",
    "Gospel",
    "Easy Listening",
    "Spoken Word",
    "Children's",
    super::UNKNOWN,
];

const GENRE_TABLE: &[(&str, &[&str])] = &[
    (
        "Electronic",
        &[
            "electronic", "electronica", "electro", "edm", "electronic dance music", "dance",
            "dance music", "house", "deep house", "tech house", "progressive house",
            "acid house", "electro house", "future house", "tropical house", "techno",
            "minimal techno", "detroit techno", "acid techno", "hardcore techno", "trance",
            "progressive trance", "psytrance", "psychedelic trance", "goa trance",
            "uplifting trance", "dubstep", "brostep", "drum and bass", "dnb", "jungle",
            "liquid funk", "breakbeat", "big beat", "breaks", "uk garage", "garage",
            "2 step", "future garage", "idm", "intelligent dance music", "glitch", "synthwave",
            "retrowave", "outrun", "vaporwave", "chillwave", "chiptune", "8 bit", "bitpop",
            "hardstyle", "gabber", "happy hardcore", "eurodance", "euro house", "italo disco",
            "nu disco", "electroclash", "downtempo", "trip hop", "lo fi", "lofi", "chillout",
            "chill out", "chill", "ebm", "industrial", "electro industrial", "footwork",
            "juke", "moombahton", "future bass", "witch house", "electro swing",
            "musica electronica", "musique electronique", "elektronische musik",
        ],
    ),
    (
        "Ambient",
        &[
            "ambient", "dark ambient", "drone", "space ambient", "space music", "new age",
            "meditation", "relaxation", "sleep", "nature sounds", "healing", "musique ambiante",
        ],
    ),
    (
        "Rock",
        &[
            "rock", "classic rock", "hard rock", "soft rock", "alternative", "alternative rock",
            "alt rock", "indie", "indie rock", "art rock", "progressive rock", "prog rock",
            "prog", "psychedelic", "psychedelic rock", "psychedelia", "garage rock", "grunge",
            "post grunge", "post rock", "math rock", "shoegaze", "noise rock", "stoner rock",
            "southern rock", "blues rock", "folk rock", "country rock", "surf rock", "surf",
            "rockabilly", "rock and roll", "rock n roll", "britpop", "krautrock", "glam rock",
            "glam", "space rock", "arena rock", "aor", "album rock", "adult alternative",
            "modern rock", "experimental rock", "new wave", "gothic rock", "goth", "darkwave",
            "coldwave", "jangle pop", "heartland rock", "pub rock", "yacht rock", "rap rock",
            "j rock", "visual kei", "rock alternativo", "rock en espanol",
        ],
    ),
    (
        "Metal",
        &[
            "metal", "heavy metal", "death metal", "melodic death metal",
            "technical death metal", "black metal", "atmospheric black metal", "thrash metal",
            "thrash", "doom metal", "doom", "sludge metal", "sludge", "power metal",
            "speed metal", "progressive metal", "prog metal", "symphonic metal",
            "gothic metal", "folk metal", "viking metal", "nu metal", "alternative metal",
            "metalcore", "deathcore", "mathcore", "djent", "groove metal", "industrial metal",
            "grindcore", "post metal", "stoner metal", "glam metal", "hair metal", "nwobhm",
            "rap metal",
        ],
    ),
    (
        "Punk",
        &[
            "punk", "punk rock", "pop punk", "hardcore", "hardcore punk", "melodic hardcore",
            "post hardcore", "skate punk", "ska punk", "street punk", "oi", "crust punk",
            "crust", "anarcho punk", "emo", "screamo", "riot grrrl", "garage punk",
            "horror punk", "folk punk", "celtic punk", "post punk",
        ],
    ),
    (
        "Hip-Hop",
        &[
            "hip hop", "hiphop", "rap", "gangsta rap", "trap", "drill", "uk drill", "boom bap",
            "conscious hip hop", "alternative hip hop", "underground hip hop",
            "east coast hip hop", "west coast hip hop", "southern hip hop", "dirty south",
            "crunk", "g funk", "grime", "horrorcore", "jazz rap", "lo fi hip hop", "cloud rap",
            "emo rap", "mumble rap", "phonk", "turntablism", "instrumental hip hop", "pop rap",
            "french rap", "deutschrap", "rap francais",
        ],
    ),
    (
        "Pop",
        &[
            "pop", "pop rock", "synthpop", "synth pop", "electropop", "electro pop",
            "dance pop", "teen pop", "indie pop", "dream pop", "art pop", "chamber pop",
            "baroque pop", "power pop", "bubblegum", "bubblegum pop", "k pop", "kpop", "j pop",
            "jpop", "c pop", "mandopop", "cantopop", "europop", "schlager", "top 40",
            "sophisti pop", "city pop", "hyperpop", "bedroom pop", "sunshine pop",
            "traditional pop", "vocal pop", "ballad", "ballads", "variete francaise",
        ],
    ),
    (
        "R&B/Soul",
        &[
            "r and b", "rnb", "rhythm and blues", "soul", "neo soul", "contemporary r and b",
            "alternative r and b", "motown", "northern soul", "southern soul", "philly soul",
            "quiet storm", "new jack swing", "urban", "urban contemporary", "hip hop soul",
            "pop soul", "blue eyed soul", "doo wop", "smooth soul",
        ],
    ),
    (
        "Funk",
        &[
            "funk", "p funk", "funk rock", "electro funk", "go go", "boogie", "funky",
            "afro funk", "disco",
        ],
    ),
    (
        "Jazz",
        &[
            "jazz", "smooth jazz", "bebop", "bop", "hard bop", "post bop", "cool jazz",
            "modal jazz", "free jazz", "avant garde jazz", "jazz fusion", "fusion",
            "jazz funk", "acid jazz", "swing", "big band", "dixieland", "ragtime",
            "vocal jazz", "latin jazz", "gypsy jazz", "nu jazz", "contemporary jazz",
            "jazz rock", "soul jazz", "third stream", "crossover jazz", "jazz standards",
        ],
    ),
    (
        "Blues",
        &[
            "blues", "delta blues", "chicago blues", "electric blues", "country blues",
            "texas blues", "jump blues", "piedmont blues", "modern blues", "soul blues",
            "boogie woogie", "acoustic blues", "british blues",
        ],
    ),
    (
        "Classical",
        &[
            "classical", "classical music", "baroque", "romantic", "opera", "operetta",
            "chamber music", "chamber", "symphony", "symphonic", "orchestral", "orchestra",
            "choral", "choir", "early music", "medieval", "renaissance",
            "contemporary classical", "modern classical", "neoclassical", "neo classical",
            "minimalism", "minimalist", "impressionist", "avant garde", "art music", "piano",
            "solo piano", "concerto", "string quartet", "sacred music", "classique",
            "musique classique", "musica clasica", "musica classica", "klassik",
            "klassische musik", "kammermusik",
        ],
    ),
    (
        "Country",
        &[
            "country", "country music", "alt country", "alternative country", "americana",
            "bluegrass", "honky tonk", "outlaw country", "country pop", "contemporary country",
            "red dirt", "western", "western swing", "cowboy", "nashville sound",
            "country and western", "bro country", "traditional country",
        ],
    ),
    (
        "Folk",
        &[
            "folk", "folk music", "contemporary folk", "indie folk", "folk pop", "freak folk",
            "anti folk", "traditional folk", "celtic folk", "singer songwriter", "acoustic",
            "british folk", "irish folk", "neofolk", "chamber folk", "psych folk",
            "psychedelic folk", "sea shanty", "shanty",
        ],
    ),
    (
        "Reggae",
        &[
            "reggae", "roots reggae", "dub", "dancehall", "ska", "rocksteady", "lovers rock",
            "ragga", "reggae fusion", "two tone", "2 tone",
        ],
    ),
    (
        "Latin",
        &[
            "latin", "latin pop", "latin rock", "reggaeton", "salsa", "bachata", "merengue",
            "cumbia", "bossa nova", "samba", "mpb", "musica popular brasileira", "tango",
            "flamenco", "mariachi", "ranchera", "banda", "norteno", "tejano", "son cubano",
            "bolero", "latin trap", "latin urban", "urbano latino", "vallenato", "forro",
            "musica latina", "corridos", "regional mexican", "musica mexicana",
        ],
    ),
    (
        "World",
        &[
            "world", "world music", "worldbeat", "afrobeat", "afrobeats", "afropop",
            "highlife", "soukous", "african", "celtic", "celtic music", "irish", "traditional",
            "indian", "bollywood", "filmi", "carnatic", "hindustani", "qawwali", "bhangra",
            "arabic", "middle eastern", "klezmer", "balkan", "polka", "fado", "chanson",
            "mbalax", "gnawa", "zydeco", "cajun", "hawaiian", "enka", "throat singing",
            "gamelan", "international",
        ],
    ),
    (
        "Soundtrack",
        &[
            "soundtrack", "soundtracks", "original soundtrack", "ost", "score", "film score",
            "film soundtrack", "movie soundtrack", "film", "movie", "game soundtrack",
            "video game music", "vgm", "video game", "anime", "musical", "musicals",
            "show tunes", "broadway", "stage and screen", "tv soundtrack", "television",
            "banda sonora", "colonna sonora", "filmmusik", "musique de film",
        ],
    ),
    (
        "Gospel",
        &[
            "gospel", "christian", "contemporary christian", "ccm", "christian rock",
            "christian pop", "worship", "praise and worship", "praise", "spirituals",
            "southern gospel", "black gospel", "hymns", "hymn", "religious", "sacred",
            "devotional",
        ],
    ),
    (
        "Easy Listening",
        &[
            "easy listening", "lounge", "exotica", "space age pop", "adult contemporary",
            "instrumental", "mood music", "beautiful music", "elevator music",
            "background music", "muzak", "light music", "crooner", "vocal", "standards",
            "oldies", "nostalgia",
        ],
    ),
    (
        "Spoken Word",
        &[
            "spoken word", "audiobook", "audiobooks", "audio book", "podcast", "comedy",
            "stand up comedy", "stand up", "poetry", "speech", "talk", "radio play",
            "audio drama", "interview", "lecture", "books and spoken",
        ],
    ),
    (
        "Children's",
        &[
            "children's", "children's music", "childrens", "childrens music", "children",
            "kids", "kids music", "lullaby", "lullabies", "nursery rhymes", "family", "disney",
        ],
    ),
    (
        super::UNKNOWN,
        &[
            "unknown", "other", "misc", "miscellaneous", "none", "genre", "various",
            "unclassifiable",
        ],
    ),
];

/// Normalized key to umbrella category
pub(super) static UMBRELLA_INDEX: Lazy<HashMap<&'static str, &'static str>> = Lazy::new(|| {
    GENRE_TABLE
        .iter()
        .flat_map(|(umbrella, keys)| keys.iter().map(move |key| (*key, *umbrella)))
        .collect()
});

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genre::normalize;
    use std::collections::HashSet;

    #[test]
    fn test_table_keys_are_normalized() {
        for (_, keys) in GENRE_TABLE {
            for key in *keys {
                assert_eq!(normalize(key), *key, "table key {:?} is not normalized", key);
            }
        }
    }

    #[test]
    fn test_table_keys_are_unique() {
        let mut seen = HashSet::new();
        for (umbrella, keys) in GENRE_TABLE {
            for key in *keys {
                assert!(seen.insert(*key), "{:?} listed twice (again under {})", key, umbrella);
            }
        }
        assert_eq!(UMBRELLA_INDEX.len(), seen.len());
        assert!(UMBRELLA_INDEX.len() >= 400);
    }

    #[test]
    fn test_every_table_umbrella_is_listed() {
        for (umbrella, _) in GENRE_TABLE {
            assert!(UMBRELLA_GENRES.contains(umbrella), "{} missing", umbrella);
        }
    }
}
