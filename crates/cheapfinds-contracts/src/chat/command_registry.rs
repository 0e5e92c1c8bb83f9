#[derive(Clone, Copy, Debug)]
pub(crate) struct CommandSpec {
    pub command: &'static str,
    pub action: &'static str,
    pub key: &'static str,
}

pub(crate) const RAW_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "mode",
        action: "set_mode",
        key: "mode",
    },
    CommandSpec {
        command: "country",
        action: "set_region",
        key: "region",
    },
    CommandSpec {
        command: "open",
        action: "open_history",
        key: "index",
    },
];

pub(crate) const SINGLE_PATH_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "save",
        action: "save_chat",
        key: "path",
    },
    CommandSpec {
        command: "load",
        action: "load_chat",
        key: "path",
    },
];

pub(crate) const MULTI_PATH_COMMANDS: &[CommandSpec] = &[CommandSpec {
    command: "image",
    action: "add_images",
    key: "paths",
}];

pub(crate) const NO_ARG_COMMANDS: &[CommandSpec] = &[
    CommandSpec {
        command: "help",
        action: "help",
        key: "",
    },
    CommandSpec {
        command: "search",
        action: "search",
        key: "",
    },
    CommandSpec {
        command: "history",
        action: "history",
        key: "",
    },
    CommandSpec {
        command: "share",
        action: "share",
        key: "",
    },
    CommandSpec {
        command: "clear",
        action: "clear",
        key: "",
    },
    CommandSpec {
        command: "regions",
        action: "regions",
        key: "",
    },
    CommandSpec {
        command: "quit",
        action: "quit",
        key: "",
    },
    CommandSpec {
        command: "exit",
        action: "quit",
        key: "",
    },
];

pub(crate) const IMAGES_COMMAND: &str = "images";

pub const SHELL_HELP_COMMANDS: &[&str] = &[
    "/help",
    "/mode single|multi|chat",
    "/image PATH...",
    "/images clear",
    "/country NAME",
    "/regions",
    "/search",
    "/history",
    "/open N",
    "/share",
    "/clear",
    "/save PATH",
    "/load PATH",
    "/quit",
];
