//! Startup tasks: host registration and the filesystem-root folder.

use tracing::info;
use uuid::Uuid;

use crate::context::GraphContext;
use crate::graph::{GraphError, GraphResult, NewVertex, PropertyMap, VertexQuery};
use crate::node::{keys, now_secs, Element, Vertex, VertexDraft};

/// Find or create the registration record of this host.
///
/// One `register`-labelled vertex per `{client_id}@{hostname}` and namespace.
pub async fn register(ctx: &GraphContext) -> GraphResult<Vertex> {
    let config = ctx.config();
    let hostname = hostname::get()?.to_string_lossy().into_owned();
    let name = format!("{}@{}", config.client_id, hostname);

    let query = VertexQuery::new()
        .label(config.register_label.as_str())
        .has(keys::NAMESPACE, config.fs_ns.as_str())
        .has(keys::NAME, name.as_str());
    if let Some(existing) = ctx.engine().find_vertices(&query).await?.into_iter().next() {
        info!(%name, id = existing.id, "host already registered");
        return Ok(Vertex::from_record(existing));
    }

    let now = now_secs();
    let mut properties = PropertyMap::new();
    properties.insert(keys::NAME.into(), name.as_str().into());
    properties.insert(keys::UUID.into(), Uuid::new_v4().to_string().into());
    properties.insert(keys::NAMESPACE.into(), config.fs_ns.as_str().into());
    properties.insert(keys::CREATED.into(), now.into());
    properties.insert(keys::MODIFIED.into(), now.into());
    properties.insert("client_id".into(), config.client_id.as_str().into());
    properties.insert("hostname".into(), hostname.into());
    properties.insert("username".into(), whoami::username().into());
    properties.insert("platform".into(), whoami::platform().to_string().into());
    properties.insert("machine_architecture".into(), whoami::arch().to_string().into());
    properties.insert("system_name".into(), whoami::distro().into());

    let record = ctx
        .engine()
        .add_vertex(NewVertex {
            label: config.register_label.clone(),
            properties,
            out_edges: Vec::new(),
        })
        .await?;
    info!(%name, id = record.id, "registered host");
    Ok(Vertex::from_record(record))
}

/// Make sure the configured filesystem root exists.
///
/// Returns the root folder, or `None` when no root is configured or it is
/// missing and `fs_root_init` is off.
pub async fn ensure_root(ctx: &GraphContext) -> GraphResult<Option<Vertex>> {
    let config = ctx.config();
    let Some(root_id) = config.fs_root.as_deref() else {
        return Ok(None);
    };
    if let Some(root) = Vertex::load(ctx, root_id).await? {
        return Ok(Some(root));
    }
    if !config.fs_root_init {
        return Ok(None);
    }

    let parsed = ctx.codec().parse(root_id);
    let uuid = parsed
        .uuid
        .ok_or_else(|| GraphError::invalid(format!("fs_root {root_id} carries no uuid")))?;
    let name = parsed
        .name
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| uuid.to_string());
    let mut draft = VertexDraft::new(name).uuid(uuid);
    if let Some(label) = parsed.label {
        draft = draft.label(label);
    }
    let root = draft.create_folder(ctx, None).await?;
    info!(root = %root.identifier(ctx, false), id = root.id(), "created filesystem root");
    Ok(Some(root))
}
