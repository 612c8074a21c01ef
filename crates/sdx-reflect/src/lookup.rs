use std::fmt;

use sdx_config::LookupConfig;
pub use sdx_config::LookupMode;
use sdx_types::{is_subclass, package_name, top_level_name, ClassId, TypeEnv, Visibility};

/// A privileged-access context: the rights under which members are turned into handles.
///
/// Access is judged from the point of view of the lookup class. A member whose `accessible` flag
/// was set is always granted. Without a lookup class only public members of public classes are
/// reachable, so the default lookup is [`Lookup::public`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Lookup {
    class: Option<String>,
    mode: LookupMode,
}

impl Lookup {
    /// Public members of public classes only.
    pub fn public() -> Self {
        Self {
            class: None,
            mode: LookupMode::Public,
        }
    }

    /// Full access rights of the class with binary name `class`.
    pub fn in_class(class: impl Into<String>) -> Self {
        Self {
            class: Some(class.into()),
            mode: LookupMode::Full,
        }
    }

    pub fn with_mode(mut self, mode: LookupMode) -> Self {
        self.mode = mode;
        self
    }

    /// A configured lookup; without a class the mode is irrelevant and the public lookup is used.
    pub fn from_config(config: &LookupConfig) -> Self {
        match &config.class {
            Some(class) => Self::in_class(class.clone()).with_mode(config.mode),
            None => Self::public(),
        }
    }

    pub fn lookup_class(&self) -> Option<&str> {
        self.class.as_deref()
    }

    pub fn mode(&self) -> LookupMode {
        self.mode
    }

    /// Whether a member of `owner` with the given visibility may be used through this lookup.
    pub fn can_access(
        &self,
        env: &dyn TypeEnv,
        owner: ClassId,
        visibility: Visibility,
        accessible: bool,
    ) -> bool {
        if accessible {
            return true;
        }
        let Some(owner_def) = env.class(owner) else {
            return false;
        };

        let class = self.class.as_deref().filter(|_| self.mode != LookupMode::Public);
        let same_package = class.is_some_and(|class| package_name(class) == owner_def.package());

        match visibility {
            Visibility::Public => owner_def.is_public() || same_package,
            Visibility::Package => same_package,
            Visibility::Protected => {
                same_package
                    || (self.mode == LookupMode::Full
                        && class
                            .and_then(|class| env.lookup_class(class))
                            .is_some_and(|sub| is_subclass(env, sub, owner)))
            }
            Visibility::Private => {
                self.mode == LookupMode::Full
                    && class
                        .is_some_and(|class| top_level_name(class) == owner_def.top_level_name())
            }
        }
    }
}

impl Default for Lookup {
    fn default() -> Self {
        Self::public()
    }
}

impl fmt::Display for Lookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match (&self.class, self.mode) {
            (None, _) | (_, LookupMode::Public) => f.write_str("the public lookup"),
            (Some(class), LookupMode::Package) => write!(f, "the package lookup of {class}"),
            (Some(class), LookupMode::Full) => write!(f, "the lookup of {class}"),
        }
    }
}
