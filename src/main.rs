use anyhow::{bail, Context, Result};
use clap::Parser;
use cp_translator::utils::preview;
use cp_translator::{
    pair_dictionaries, read_string_map, write_string_map, ContentPack, Dictionary, FormatOptions, FormattedString,
    LanguageFilter, StrFormat, SubstituteMode, WalkOptions,
};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "cp_translator")]
#[command(about = "提取、翻译和格式化 Content Patcher 文档中的字符串")]
#[command(version = "0.1.0")]
struct Cli {
    /// 输入的 content.json 路径（提取模式可指定多个）
    #[arg(short, long, num_args = 1..)]
    input: Vec<PathBuf>,

    /// 输出文件路径
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// 翻译模式：应用 原文 → 译文 字典
    #[arg(long)]
    apply_dict: Option<PathBuf>,

    /// 未完全匹配时替换文本中出现的字典键
    #[arg(long)]
    replace: bool,

    /// 配对两个语言版本提取出的字典：<原文字典> <译文字典>
    #[arg(long, num_args = 2, value_names = ["SOURCE", "TARGET"])]
    pair: Option<Vec<PathBuf>>,

    /// 反编译：把 Dialogue / Events 表写入指定的源码目录
    #[arg(long)]
    decompile: Option<PathBuf>,

    /// 构建：编译输入文档引用的源码表（与 --apply-dict 一起使用时以替换模式应用字典）
    #[arg(long)]
    build: bool,

    /// 输出字符串的源码视图
    #[arg(long)]
    format_string: Option<String>,

    /// 字符串类型：plain、dialogue 或 events
    #[arg(long, default_value = "plain")]
    kind: String,

    /// 与 --format-string 一起使用：把输入视为源码并压缩
    #[arg(long)]
    compact: bool,

    /// 外部文件的根目录（默认为输入文件所在目录）
    #[arg(long)]
    env: Option<PathBuf>,

    /// 输入文件编码（WHATWG 标签，默认 utf-8）
    #[arg(long)]
    encoding: Option<String>,

    /// 提取时的语言过滤（zh：只保留包含中文的文本）
    #[arg(long)]
    lang: Option<String>,

    /// 静默模式(仅输出错误)
    #[arg(long)]
    quiet: bool,

    /// 输出调试日志
    #[arg(short, long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(&cli);

    // 处理不同的操作模式
    if let Some(text) = &cli.format_string {
        return handle_format_string(&cli, text);
    }

    if let Some(pair) = &cli.pair {
        return handle_pairing(&cli, pair);
    }

    validate_inputs(&cli.input)?;

    if let Some(src_dir) = &cli.decompile {
        return handle_decompile(&cli, src_dir);
    }

    if cli.build {
        return handle_build(&cli);
    }

    if let Some(dict_file) = &cli.apply_dict {
        return handle_translation(&cli, dict_file);
    }

    // 默认模式：字典提取
    handle_extraction(&cli)
}

/// 初始化日志：RUST_LOG 优先，否则按 --quiet / --verbose 决定级别
fn init_logging(cli: &Cli) {
    let level = if cli.quiet {
        "error"
    } else if cli.verbose {
        "debug"
    } else {
        "info"
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_target(false)
        .with_writer(std::io::stderr)
        .with_env_filter(filter)
        .init();
}

/// 验证输入文件
fn validate_inputs(inputs: &[PathBuf]) -> Result<()> {
    if inputs.is_empty() {
        bail!("缺少输入文件，请使用 --input 指定 content.json");
    }
    for input in inputs {
        if !input.is_file() {
            bail!("输入文件不存在: {:?}", input);
        }
    }
    Ok(())
}

/// 外部文件根目录
fn env_root(cli: &Cli, input: &Path) -> PathBuf {
    cli.env.clone().unwrap_or_else(|| {
        input
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."))
    })
}

fn load_pack(cli: &Cli, input: &Path) -> Result<ContentPack> {
    ContentPack::load(input, cli.encoding.as_deref()).with_context(|| format!("解析文档失败: {:?}", input))
}

fn load_dictionary(cli: &Cli, path: &Path) -> Result<Dictionary> {
    read_string_map(path, cli.encoding.as_deref()).with_context(|| format!("读取字典失败: {:?}", path))
}

/// 处理字典提取
fn handle_extraction(cli: &Cli) -> Result<()> {
    let filter = match &cli.lang {
        Some(code) => Some(LanguageFilter::from_code(code).with_context(|| format!("不支持的语言过滤: {}", code))?),
        None => None,
    };

    // 每个文档独立处理
    let results: Vec<Result<Dictionary>> = cli
        .input
        .par_iter()
        .map(|input| {
            let pack = load_pack(cli, input)?;
            pack.extract_dict(&env_root(cli, input), filter)
                .with_context(|| format!("提取失败: {:?}", input))
        })
        .collect();

    let mut dictionary = Dictionary::new();
    for result in results {
        dictionary.extend(result?);
    }

    let output_path = cli.output.clone().unwrap_or_else(|| env_root(cli, &cli.input[0]).join("dict.json"));
    write_string_map(&output_path, &dictionary, true).with_context(|| format!("写入文件失败: {:?}", output_path))?;

    tracing::info!("提取到 {} 个字符串，结果已写入: {:?}", dictionary.len(), output_path);
    print_samples(&dictionary);
    Ok(())
}

/// 处理字典翻译
fn handle_translation(cli: &Cli, dict_file: &Path) -> Result<()> {
    let input = single_input(cli)?;
    let dictionary = load_dictionary(cli, dict_file)?;
    let mode = if cli.replace {
        SubstituteMode::Replace
    } else {
        SubstituteMode::Exact
    };

    let pack = load_pack(cli, input)?;
    let options = WalkOptions::new(env_root(cli, input)).with_mode(mode);
    let translated = pack
        .translate(&dictionary, &options)
        .with_context(|| format!("翻译失败: {:?}", input))?;

    let output_path = cli.output.clone().unwrap_or_else(|| translated_output_path(input));
    translated
        .save(&output_path)
        .with_context(|| format!("写入文件失败: {:?}", output_path))?;

    tracing::info!("翻译完成，输出到: {:?}", output_path);
    Ok(())
}

/// 处理字典配对
fn handle_pairing(cli: &Cli, pair: &[PathBuf]) -> Result<()> {
    let [source, target] = pair else {
        bail!("--pair 需要两个字典文件");
    };
    let paired = pair_dictionaries(&load_dictionary(cli, source)?, &load_dictionary(cli, target)?);

    let output_path = cli.output.clone().unwrap_or_else(|| PathBuf::from("paired.json"));
    write_string_map(&output_path, &paired, true).with_context(|| format!("写入文件失败: {:?}", output_path))?;

    tracing::info!("配对 {} 个条目，结果已写入: {:?}", paired.len(), output_path);
    Ok(())
}

/// 处理反编译
fn handle_decompile(cli: &Cli, src_dir: &Path) -> Result<()> {
    let input = single_input(cli)?;
    let pack = load_pack(cli, input)?;
    let source = pack
        .decompile_to(src_dir, &FormatOptions::default())
        .with_context(|| format!("反编译失败: {:?}", input))?;

    let output_path = cli.output.clone().unwrap_or_else(|| src_dir.join("content.json"));
    source
        .save(&output_path)
        .with_context(|| format!("写入文件失败: {:?}", output_path))?;

    tracing::info!("反编译完成，源码文档: {:?}", output_path);
    Ok(())
}

/// 处理构建
fn handle_build(cli: &Cli) -> Result<()> {
    let input = single_input(cli)?;
    let replace = match &cli.apply_dict {
        Some(path) => Some(load_dictionary(cli, path)?),
        None => None,
    };

    let pack = load_pack(cli, input)?;
    let built = pack
        .build(&env_root(cli, input), replace.as_ref())
        .with_context(|| format!("构建失败: {:?}", input))?;

    let output_path = match &cli.output {
        Some(path) => path.clone(),
        None => {
            let parent = env_root(cli, input);
            parent.parent().unwrap_or(parent.as_path()).join("content.json")
        }
    };
    built
        .save(&output_path)
        .with_context(|| format!("写入文件失败: {:?}", output_path))?;

    tracing::info!("构建完成，输出到: {:?}", output_path);
    Ok(())
}

/// 处理字符串格式化
fn handle_format_string(cli: &Cli, text: &str) -> Result<()> {
    let format = StrFormat::from_name(&cli.kind);
    let result = if cli.compact {
        FormattedString::from_source(format, text, FormatOptions::default())?.into_string()
    } else {
        FormattedString::new(format, text).to_source()?
    };
    println!("{}", result);
    Ok(())
}

fn single_input(cli: &Cli) -> Result<&PathBuf> {
    match cli.input.as_slice() {
        [input] => Ok(input),
        _ => bail!("该模式只接受一个输入文件"),
    }
}

/// 获取翻译输出路径：`<stem>-translated.<ext>`
fn translated_output_path(input: &Path) -> PathBuf {
    let stem = input.file_stem().and_then(|s| s.to_str()).unwrap_or("content");
    let file_name = match input.extension().and_then(|e| e.to_str()) {
        Some(ext) => format!("{}{}.{}", stem, cp_translator::TRANSLATED_SUFFIX, ext),
        None => format!("{}{}", stem, cp_translator::TRANSLATED_SUFFIX),
    };
    input.with_file_name(file_name)
}

/// 显示样例字符串
fn print_samples(dictionary: &Dictionary) {
    for (i, (id, text)) in dictionary.iter().take(3).enumerate() {
        tracing::info!("{}. [{}] \"{}\"", i + 1, id, preview(text));
    }
    if dictionary.len() > 3 {
        tracing::info!("... 还有 {} 个字符串", dictionary.len() - 3);
    }
}
