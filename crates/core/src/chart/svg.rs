//! SVG serialization of a [`Scene`].

use std::fmt::{self, Write};

use crate::chart::scene::{
    Layer, LinkPath, MarriagePath, NodeGlyph, Scene, LABEL_OFFSET, LINK_STROKE, MARRIAGE_DASH,
    MARRIAGE_STROKE,
};

/// Person silhouette in a 24x24 box, drawn when a node has no photo.
const PERSON_ICON: &str = "M12,4A4,4 0 0,1 16,8A4,4 0 0,1 12,12A4,4 0 0,1 8,8A4,4 0 0,1 12,4M12,14C16.42,14 20,15.79 20,18V20H4V18C4,15.79 7.58,14 12,14Z";

/// Render `scene` as a standalone SVG document.
pub fn render(scene: &Scene) -> Result<String, fmt::Error> {
    let mut out = String::new();
    write_svg(&mut out, scene)?;
    Ok(out)
}

/// Write `scene` as a standalone SVG document into `out`.
pub fn write_svg(out: &mut impl Write, scene: &Scene) -> fmt::Result {
    let t = scene.transform;
    write!(
        out,
        r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {} {}" width="{}" height="{}">"#,
        scene.width, scene.height, scene.width, scene.height
    )?;
    write!(out, r#"<g transform="translate({},{}) scale({})">"#, t.x, t.y, t.k)?;

    for layer in Layer::PAINT_ORDER {
        write!(out, r#"<g class="{}">"#, layer.class_name())?;
        match layer {
            Layer::Marriage => {
                for path in &scene.marriages {
                    write_marriage(out, path)?;
                }
            }
            Layer::Links => {
                for link in &scene.links {
                    write_link(out, link)?;
                }
            }
            Layer::Nodes => {
                for node in &scene.nodes {
                    write_node(out, node)?;
                }
            }
        }
        out.write_str("</g>")?;
    }

    out.write_str("</g></svg>")?;
    Ok(())
}

fn write_marriage(out: &mut impl Write, p: &MarriagePath) -> fmt::Result {
    write!(
        out,
        r#"<path class="marriage-link" d="M {} {} Q {} {} {} {}" fill="none" stroke="{MARRIAGE_STROKE}" stroke-width="2" stroke-dasharray="{MARRIAGE_DASH}" opacity="{}"/>"#,
        p.from.x, p.from.y, p.control.x, p.control.y, p.to.x, p.to.y, p.opacity
    )
}

fn write_link(out: &mut impl Write, link: &LinkPath) -> fmt::Result {
    let (c1, c2) = link.controls();
    write!(
        out,
        r#"<path class="link" d="M {} {} C {} {}, {} {}, {} {}" fill="none" stroke="{LINK_STROKE}" stroke-width="1.5"/>"#,
        link.from.x, link.from.y, c1.x, c1.y, c2.x, c2.y, link.to.x, link.to.y
    )
}

fn write_node(out: &mut impl Write, node: &NodeGlyph) -> fmt::Result {
    write!(
        out,
        r#"<g class="node" data-id="{}" transform="translate({},{})">"#,
        node.id, node.position.x, node.position.y
    )?;
    write!(
        out,
        r#"<circle class="node-circle" r="{}" fill="{}" stroke="{}" stroke-width="2"/>"#,
        node.radius,
        node.kind.fill(),
        node.kind.stroke()
    )?;

    match &node.photo_url {
        Some(url) => {
            let r = node.radius;
            write!(
                out,
                r#"<defs><clipPath id="clip-{id}"><circle r="{r}"/></clipPath></defs><image href="{href}" x="{x}" y="{x}" width="{d}" height="{d}" clip-path="url(#clip-{id})" preserveAspectRatio="xMidYMid slice"/>"#,
                id = node.id,
                href = escape(url),
                x = -r,
                d = 2.0 * r,
            )?;
        }
        None => {
            write!(
                out,
                r#"<path d="{PERSON_ICON}" transform="translate(-12,-12)" fill="{}"/>"#,
                node.kind.icon_color()
            )?;
        }
    }

    write!(
        out,
        r##"<text class="node-label" y="{LABEL_OFFSET}" dy=".35em" text-anchor="middle" fill="#1c1917" fill-opacity="{}">{}</text></g>"##,
        node.label_opacity,
        escape(&node.label)
    )
}

fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::scene::GlyphKind;
    use crate::chart::viewport::Transform;
    use crate::chart::Point;

    fn scene_with(nodes: Vec<NodeGlyph>, marriages: Vec<MarriagePath>) -> Scene {
        Scene {
            width: 800.0,
            height: 600.0,
            transform: Transform { x: 400.0, y: 80.0, k: 0.85 },
            marriages,
            links: Vec::new(),
            nodes,
        }
    }

    fn glyph(label: &str, photo_url: Option<&str>) -> NodeGlyph {
        NodeGlyph {
            id: 7,
            position: Point::new(10.0, 20.0),
            radius: 24.0,
            kind: GlyphKind::Leaf,
            label: label.to_string(),
            label_opacity: 1.0,
            photo_url: photo_url.map(str::to_string),
        }
    }

    #[test]
    fn layers_are_painted_in_order() {
        let svg = render(&scene_with(Vec::new(), Vec::new())).unwrap();
        let marriage = svg.find("layer-marriage").unwrap();
        let links = svg.find("layer-links").unwrap();
        let nodes = svg.find("layer-nodes").unwrap();
        assert!(marriage < links && links < nodes);
        assert!(svg.contains("translate(400,80) scale(0.85)"));
    }

    #[test]
    fn labels_are_escaped() {
        let svg = render(&scene_with(vec![glyph("Tom & <Jerry>", None)], Vec::new())).unwrap();
        assert!(svg.contains("Tom &amp; &lt;Jerry&gt;"));
        assert!(svg.contains(PERSON_ICON));
    }

    #[test]
    fn photos_are_clipped_to_the_circle() {
        let svg = render(&scene_with(vec![glyph("A", Some("/p.jpg"))], Vec::new())).unwrap();
        assert!(svg.contains(r#"<clipPath id="clip-7">"#));
        assert!(svg.contains(r#"href="/p.jpg" x="-24" y="-24" width="48""#));
    }

    #[test]
    fn writes_append_to_an_existing_buffer() {
        let scene = scene_with(vec![glyph("A", None)], Vec::new());
        let mut out = String::from("<!-- chart -->");
        write_svg(&mut out, &scene).unwrap();
        assert!(out.starts_with("<!-- chart --><svg "));
        assert_eq!(&out["<!-- chart -->".len()..], render(&scene).unwrap());
    }

    #[test]
    fn marriage_paths_are_dashed_quadratics() {
        let path = MarriagePath {
            a: 1,
            b: 2,
            from: Point::new(0.0, 160.0),
            control: Point::new(80.0, 100.0),
            to: Point::new(160.0, 160.0),
            opacity: 1.0,
        };
        let svg = render(&scene_with(Vec::new(), vec![path])).unwrap();
        assert!(svg.contains(r#"d="M 0 160 Q 80 100 160 160""#));
        assert!(svg.contains(r#"stroke-dasharray="4,4""#));
        assert!(svg.contains("#d4af37"));
    }
}
