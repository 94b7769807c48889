use avatar_ngin::{
    data_structures::{
        attachment::TextureKind,
        texture::{TextureId, TextureSources, resolve_kind, resolve_texture},
    },
    host::PlayerTextures,
};

use crate::common::test_utils::{FakeHostTextures, cube};

mod common;

fn player(skin: Option<&str>, cape: Option<&str>, elytra: Option<&str>) -> PlayerTextures {
    PlayerTextures {
        skin: skin.map(TextureId::parse),
        cape: cape.map(TextureId::parse),
        elytra: elytra.map(TextureId::parse),
    }
}

#[test]
fn nothing_resolves_to_the_placeholder() {
    let sources = TextureSources::default();
    for kind in [
        TextureKind::Custom,
        TextureKind::Skin,
        TextureKind::Cape,
    ] {
        assert_eq!(
            resolve_kind(kind, None, &sources),
            TextureId::default_placeholder(),
            "{kind:?}"
        );
    }
}

#[test]
fn cape_comes_from_player_textures() {
    let host = FakeHostTextures {
        player: Some(player(None, Some("skins:cape"), None)),
        ..Default::default()
    };
    let sources = TextureSources {
        custom: None,
        host: Some(&host),
    };
    assert_eq!(
        resolve_kind(TextureKind::Cape, None, &sources),
        TextureId::new("skins", "cape")
    );
}

#[test]
fn missing_player_texture_falls_back_to_custom() {
    let custom = TextureId::new("avatar", "main");
    let host = FakeHostTextures {
        player: Some(player(Some("skins:steve"), None, None)),
        entity: Some(TextureId::new("minecraft", "entity")),
        ..Default::default()
    };
    let sources = TextureSources {
        custom: Some(&custom),
        host: Some(&host),
    };
    assert_eq!(resolve_kind(TextureKind::Cape, None, &sources), custom);
    assert_eq!(
        resolve_kind(TextureKind::Skin, None, &sources),
        TextureId::new("skins", "steve")
    );
    assert_eq!(resolve_kind(TextureKind::Custom, None, &sources), custom);
}

#[test]
fn entity_texture_backs_up_a_missing_custom_texture() {
    let entity = TextureId::new("minecraft", "textures/entity/zombie.png");
    let host = FakeHostTextures {
        entity: Some(entity.clone()),
        ..Default::default()
    };
    let sources = TextureSources {
        custom: None,
        host: Some(&host),
    };
    assert_eq!(resolve_kind(TextureKind::Skin, None, &sources), entity);
    assert_eq!(resolve_kind(TextureKind::Custom, None, &sources), entity);
}

#[test]
fn resources_are_checked_with_the_host() {
    let known = TextureId::parse("minecraft:textures/block/stone.png");
    let unknown = TextureId::parse("textures/block/nope.png");
    let host = FakeHostTextures {
        resources: vec![known.clone()],
        ..Default::default()
    };
    let sources = TextureSources {
        custom: None,
        host: Some(&host),
    };

    assert_eq!(resolve_kind(TextureKind::Resource, Some(&known), &sources), known);
    assert_eq!(
        resolve_kind(TextureKind::Resource, Some(&unknown), &sources),
        TextureId::missing()
    );
    assert_eq!(
        resolve_kind(TextureKind::Resource, None, &sources),
        TextureId::missing()
    );
    // without a host nothing can be confirmed
    assert_eq!(
        resolve_kind(TextureKind::Resource, Some(&known), &TextureSources::default()),
        TextureId::missing()
    );
}

#[test]
fn elytra_defaults_without_player_data() {
    assert_eq!(
        resolve_kind(TextureKind::Elytra, None, &TextureSources::default()),
        TextureId::default_elytra()
    );

    let host = FakeHostTextures {
        player: Some(player(None, None, Some("skins:wings"))),
        ..Default::default()
    };
    let sources = TextureSources {
        custom: None,
        host: Some(&host),
    };
    assert_eq!(
        resolve_kind(TextureKind::Elytra, None, &sources),
        TextureId::new("skins", "wings")
    );
}

#[test]
fn nodes_resolve_through_their_own_fields() {
    let mut node = cube(1, "stone");
    node.texture_kind = TextureKind::Resource;
    node.texture_resource = Some(TextureId::parse("textures/block/stone.png"));
    let host = FakeHostTextures {
        resources: vec![TextureId::new("minecraft", "textures/block/stone.png")],
        ..Default::default()
    };
    let sources = TextureSources {
        custom: None,
        host: Some(&host),
    };
    assert_eq!(
        resolve_texture(&node, &sources).to_string(),
        "minecraft:textures/block/stone.png"
    );
}
